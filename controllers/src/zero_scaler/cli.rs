use anyhow::{bail, Context, Result};
use clap::Parser;
use config::{Config, Environment, File};
use resources::config::ScalerConfig;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/faas-idler/config.yaml";
/// Separates several headers in `IDLER_GATEWAY_HEADERS`.
pub const ENV_LIST_SEPARATOR: &str = ";";

/// Scale idle functions to zero replicas.
///
/// Settings are read from the config file, then `IDLER_*` environment
/// variables, then these flags.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Show verbose debug information, twice for trace output
    #[clap(short = 'v', long = "verbose", parse(from_occurrences))]
    pub verbose: u64,
    /// Show scaling events without committing them
    #[clap(short = 'd', long, alias = "dry_run")]
    pub dry_run: bool,
    /// Full URI of the function gateway
    #[clap(short = 'g', long, alias = "gateway_uri")]
    pub gateway_uri: Option<String>,
    /// Additional header for gateway calls, eg. `Authorization: Bearer <token>`
    #[clap(short = 'a', long = "gateway-header", alias = "gateway_header")]
    pub gateway_headers: Vec<String>,
    /// Host of the prometheus server
    #[clap(short = 'p', long, alias = "prometheus_host")]
    pub prometheus_host: Option<String>,
    /// Port of the prometheus server
    #[clap(short = 'o', long, alias = "prometheus_port")]
    pub prometheus_port: Option<u16>,
    /// Seconds between two polling cycles
    #[clap(short = 'f', long, alias = "polling_frequency")]
    pub polling_frequency: Option<u64>,
    /// Seconds a function must go without invocations to be scaled to zero
    #[clap(short = 'i', long, alias = "default_scale_interval")]
    pub default_scale_interval: Option<u64>,
    /// Ignore scaling labels and run for every function found
    #[clap(short = 'n', long, alias = "ignore_labels")]
    pub ignore_labels: bool,
    /// Maximum number of metrics queries in flight
    #[clap(short = 'c', long)]
    pub max_concurrency: Option<usize>,
    /// Seconds before a metrics query is abandoned
    #[clap(short = 't', long)]
    pub query_timeout: Option<u64>,
    #[clap(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
    #[clap(long, env = "BASIC_AUTH_USER", hide_env_values = true)]
    pub basic_auth_user: Option<String>,
    #[clap(long, env = "BASIC_AUTH_PASSWORD", hide_env_values = true)]
    pub basic_auth_password: Option<String>,
}

impl Cli {
    pub fn load_config(&self) -> Result<ScalerConfig> {
        let mut config = Config::builder()
            .add_source(File::with_name(&self.config).required(false))
            .add_source(
                Environment::with_prefix("IDLER")
                    .try_parsing(true)
                    .list_separator(ENV_LIST_SEPARATOR)
                    .with_list_parse_key("gateway_headers"),
            )
            .build()
            .with_context(|| format!("Failed to read config from {}", self.config))?
            .try_deserialize::<ScalerConfig>()
            .with_context(|| "Failed to parse config".to_string())?;
        self.apply(&mut config);
        validate(&config)?;
        Ok(config)
    }

    /// Flags win over every other source.
    fn apply(&self, config: &mut ScalerConfig) {
        if self.verbose > 0 {
            config.verbose = self.verbose;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.ignore_labels {
            config.ignore_labels = true;
        }
        if let Some(uri) = &self.gateway_uri {
            config.gateway_uri = uri.to_owned();
        }
        config
            .gateway_headers
            .extend(self.gateway_headers.iter().cloned());
        if let Some(host) = &self.prometheus_host {
            config.prometheus_host = host.to_owned();
        }
        if let Some(port) = self.prometheus_port {
            config.prometheus_port = port;
        }
        if let Some(seconds) = self.polling_frequency {
            config.polling_frequency = seconds;
        }
        if let Some(seconds) = self.default_scale_interval {
            config.default_scale_interval = seconds;
        }
        if let Some(limit) = self.max_concurrency {
            config.max_concurrency = limit;
        }
        if let Some(seconds) = self.query_timeout {
            config.query_timeout = seconds;
        }
        if self.basic_auth_user.is_some() {
            config.basic_auth_user = self.basic_auth_user.clone();
        }
        if self.basic_auth_password.is_some() {
            config.basic_auth_password = self.basic_auth_password.clone();
        }
    }
}

/// A zero timeout fails every call and a zero period never sleeps.
fn validate(config: &ScalerConfig) -> Result<()> {
    if config.query_timeout == 0 {
        bail!("query_timeout must be at least 1 second");
    }
    if config.polling_frequency == 0 {
        bail!("polling_frequency must be at least 1 second");
    }
    Ok(())
}

/// Log filter directive for a verbosity count.
pub fn log_level(verbose: u64) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}
