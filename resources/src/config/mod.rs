use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ScalerConfig {
    /// Full URI of the function gateway
    pub gateway_uri: String,
    /// Extra headers sent on every gateway call, formatted as `Key: Value`
    pub gateway_headers: Vec<String>,
    pub prometheus_host: String,
    pub prometheus_port: u16,
    /// Seconds to wait between two polling cycles
    pub polling_frequency: u64,
    /// Lookback window in seconds over which a function must be idle
    pub default_scale_interval: u64,
    /// Log scaling decisions without committing them
    pub dry_run: bool,
    /// Consider every function, even those without the scale to zero label
    pub ignore_labels: bool,
    pub verbose: u64,
    /// Upper bound on metrics queries running at the same time
    pub max_concurrency: usize,
    /// Deadline in seconds for a single metrics query
    pub query_timeout: u64,
    pub basic_auth_user: Option<String>,
    pub basic_auth_password: Option<String>,
}

impl Default for ScalerConfig {
    fn default() -> Self {
        ScalerConfig {
            gateway_uri: "http://gateway:8080".to_string(),
            gateway_headers: Vec::new(),
            prometheus_host: "prometheus".to_string(),
            prometheus_port: 9090,
            polling_frequency: 30,
            default_scale_interval: 320,
            dry_run: false,
            ignore_labels: false,
            verbose: 0,
            max_concurrency: 8,
            query_timeout: 10,
            basic_auth_user: None,
            basic_auth_password: None,
        }
    }
}

impl ScalerConfig {
    pub fn prometheus_url(&self) -> String {
        format!("http://{}:{}", self.prometheus_host, self.prometheus_port)
    }

    /// Basic auth credentials, only when both parts are present and non-empty.
    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        match (&self.basic_auth_user, &self.basic_auth_password) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Some((user.as_str(), password.as_str()))
            },
            _ => None,
        }
    }
}
