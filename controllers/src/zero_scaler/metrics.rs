use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use resources::objects::metrics::VectorQueryResponse;

#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Run an instant query and return the result vector.
    async fn query(&self, query: &str) -> Result<VectorQueryResponse>;
}

pub struct MetricsClient {
    client: Client,
    base_url: String,
}

impl MetricsClient {
    pub fn new(client: Client, base_url: String) -> Self {
        tracing::debug!("Creating prometheus client for {}", base_url);
        Self {
            client,
            base_url,
        }
    }
}

#[async_trait]
impl MetricsSource for MetricsClient {
    async fn query(&self, query: &str) -> Result<VectorQueryResponse> {
        let response = self
            .client
            .get(format!("{}/api/v1/query", self.base_url))
            .query(&[("query", query)])
            .send()
            .await?
            .error_for_status()?
            .json::<VectorQueryResponse>()
            .await
            .with_context(|| "Failed to decode prometheus response")?;
        Ok(response)
    }
}

/// Per result code invocation rate of one function over `window`.
pub fn invocation_rate_query(function_name: &str, window: Duration) -> String {
    format!(
        "sum(\
            rate(\
                gateway_function_invocation_total{{\
                    function_name=\"{}\", code=~\".*\"\
                }}[{}s]\
            )\
        ) by (code, function_name)",
        function_name,
        window.as_secs()
    )
}
