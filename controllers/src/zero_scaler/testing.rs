use std::{
    collections::{HashMap, HashSet},
    io,
    net::SocketAddr,
    sync::Arc,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;
use resources::{
    models::ScaleServiceRequest,
    objects::{
        function::FunctionStatus,
        metrics::{VectorQueryResponse, VectorResult},
        Labels,
    },
};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

use crate::{gateway::Gateway, metrics::MetricsSource};

/// Collects formatted log output of the current thread.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route events to this capture until the guard drops. Tests run on a
    /// current thread runtime, so spawned tasks log here too.
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_target(false)
            .without_time()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock())
            .lines()
            .map(|line| line.trim().to_owned())
            .collect()
    }

    /// Whether some line carries exactly `message` after its level.
    pub fn logged(&self, message: &str) -> bool {
        self.lines().iter().any(|line| {
            line.split_once(' ')
                .map_or(false, |(_, rest)| rest.trim_start() == message)
        })
    }
}

pub struct LogWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter(self.0.clone())
    }
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: Router) -> String {
    let addr: SocketAddr = ([127, 0, 0, 1], 0).into();
    let server = axum::Server::bind(&addr).serve(app.into_make_service());
    let addr = server.local_addr();
    tokio::spawn(server);
    format!("http://{}", addr)
}

#[derive(Default)]
pub struct FakeGateway {
    functions: Option<Vec<FunctionStatus>>,
    rejected: HashSet<String>,
    list_calls: Mutex<usize>,
    attempts: Mutex<usize>,
    scaled: Mutex<Vec<ScaleServiceRequest>>,
}

impl FakeGateway {
    pub fn with_functions(functions: Vec<FunctionStatus>) -> Self {
        Self {
            functions: Some(functions),
            ..Default::default()
        }
    }

    /// A gateway whose listing always fails.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn reject(mut self, name: &str) -> Self {
        self.rejected.insert(name.to_owned());
        self
    }

    /// Accepted scale commands, in arrival order.
    pub fn scaled(&self) -> Vec<ScaleServiceRequest> {
        self.scaled.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock()
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn list_functions(&self) -> Result<Vec<FunctionStatus>> {
        *self.list_calls.lock() += 1;
        self.functions
            .clone()
            .ok_or_else(|| anyhow!("connection refused"))
    }

    async fn scale_function(&self, request: &ScaleServiceRequest) -> Result<()> {
        *self.attempts.lock() += 1;
        if self.rejected.contains(&request.service_name) {
            return Err(anyhow!("invalid response from gateway, with status 500"));
        }
        self.scaled.lock().push(request.to_owned());
        Ok(())
    }
}

pub enum Reply {
    Values(Vec<&'static str>),
    Error,
    /// Never answers
    Hang,
}

/// Answers queries per function, defaulting to an empty vector.
#[derive(Default)]
pub struct FakeMetrics {
    replies: HashMap<String, Reply>,
    queried: Mutex<Vec<String>>,
    in_flight: Mutex<(usize, usize)>,
}

impl FakeMetrics {
    pub fn reply(mut self, function_name: &str, reply: Reply) -> Self {
        self.replies.insert(function_name.to_owned(), reply);
        self
    }

    /// Function names that were queried, in call order.
    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.in_flight.lock().1
    }
}

fn function_name(query: &str) -> Option<&str> {
    let start = query.find("function_name=\"")? + "function_name=\"".len();
    let len = query[start..].find('"')?;
    Some(&query[start..start + len])
}

#[async_trait]
impl MetricsSource for FakeMetrics {
    async fn query(&self, query: &str) -> Result<VectorQueryResponse> {
        let name = function_name(query)
            .ok_or_else(|| anyhow!("unexpected query {}", query))?
            .to_owned();
        self.queried.lock().push(name.to_owned());
        {
            let mut in_flight = self.in_flight.lock();
            in_flight.0 += 1;
            in_flight.1 = in_flight.1.max(in_flight.0);
        }
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.in_flight.lock().0 -= 1;

        match self.replies.get(&name) {
            Some(Reply::Values(values)) => {
                let mut response = VectorQueryResponse::default();
                for value in values {
                    let mut metric = Labels::new();
                    metric.insert("code".to_string(), "200".to_string());
                    metric.insert("function_name".to_string(), name.to_owned());
                    response
                        .data
                        .result
                        .push(VectorResult::new(metric, 1654000000.0, value));
                }
                Ok(response)
            },
            Some(Reply::Error) => Err(anyhow!("prometheus unavailable")),
            Some(Reply::Hang) => std::future::pending().await,
            None => Ok(VectorQueryResponse::default()),
        }
    }
}
