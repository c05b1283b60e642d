use std::{sync::Arc, time::Duration};

use resources::{config::ScalerConfig, objects::function::FunctionStatus};
use tokio::{
    sync::{mpsc, Semaphore},
    time::timeout,
};

use crate::metrics::{invocation_rate_query, MetricsSource};

pub struct IdleDetector {
    metrics: Arc<dyn MetricsSource>,
    ignore_labels: bool,
    /// Lookback window of the invocation rate query
    window: Duration,
    query_timeout: Duration,
    max_concurrency: usize,
}

impl IdleDetector {
    pub fn new(metrics: Arc<dyn MetricsSource>, config: &ScalerConfig) -> Self {
        Self {
            metrics,
            ignore_labels: config.ignore_labels,
            window: Duration::from_secs(config.default_scale_interval),
            query_timeout: Duration::from_secs(config.query_timeout),
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    /// Return the subset of `functions` that received no traffic over the
    /// lookback window. Ineligible functions are never queried. Order of the
    /// result is unspecified.
    pub async fn detect_idle(&self, functions: Vec<FunctionStatus>) -> Vec<FunctionStatus> {
        tracing::debug!("Idle duration set to {}s", self.window.as_secs());
        let (tx, mut rx) = mpsc::channel::<FunctionStatus>(functions.len().max(1));
        let permits = Arc::new(Semaphore::new(self.max_concurrency));

        for function in functions {
            if !self.is_eligible(&function) {
                continue;
            }
            let tx = tx.clone();
            let permits = permits.clone();
            let metrics = self.metrics.clone();
            let query = invocation_rate_query(&function.qualified_name(), self.window);
            let deadline = self.query_timeout;
            tokio::spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                let name = function.qualified_name();
                if is_idle(metrics.as_ref(), &name, &query, deadline).await {
                    // The receiver outlives every sender
                    let _ = tx.send(function).await;
                }
            });
        }
        drop(tx);

        let mut idle_functions = Vec::new();
        while let Some(function) = rx.recv().await {
            idle_functions.push(function);
        }
        idle_functions
    }

    fn is_eligible(&self, function: &FunctionStatus) -> bool {
        if self.ignore_labels {
            return true;
        }
        let eligible = function.opted_into_scale_zero();
        if eligible {
            tracing::debug!(
                "Found scale to zero label for function {}",
                function.qualified_name()
            );
        } else {
            tracing::debug!(
                "No scale to zero label found for function {}",
                function.qualified_name()
            );
        }
        eligible
    }
}

/// Any failure to get an answer counts as traffic.
async fn is_idle(metrics: &dyn MetricsSource, name: &str, query: &str, deadline: Duration) -> bool {
    tracing::trace!("Calling prometheus with query: {}", query);
    let response = match timeout(deadline, metrics.query(query)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::debug!("Failed to query prometheus for {}: {:#}", name, e);
            return false;
        },
        Err(_) => {
            tracing::debug!(
                "Prometheus query for {} timed out after {}s",
                name,
                deadline.as_secs()
            );
            return false;
        },
    };
    tracing::trace!("Prometheus query response: {:?}", response);
    response.is_idle()
}
