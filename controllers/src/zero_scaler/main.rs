use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{log_level, Cli};
use controller::ZeroScaler;
use gateway::GatewayClient;
use metrics::MetricsClient;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

mod cli;
mod controller;
mod gateway;
mod idle;
mod metrics;
mod scaler;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = cli.load_config()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("zero_scaler={}", log_level(config.verbose))));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!(
        "Gateway: {}, prometheus: {}, polling every {}s, idle after {}s, dry run: {}, ignore \
         labels: {}",
        config.gateway_uri,
        config.prometheus_url(),
        config.polling_frequency,
        config.default_scale_interval,
        config.dry_run,
        config.ignore_labels
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.query_timeout))
        .build()
        .with_context(|| "Failed to create http client")?;
    let gateway = GatewayClient::new(client.clone(), &config)?;
    let metrics = MetricsClient::new(client, config.prometheus_url());

    let shutdown = shutdown_signal()?;
    let controller = ZeroScaler::new(Arc::new(gateway), Arc::new(metrics), &config);
    controller
        .run(async {
            let _ = shutdown.await;
        })
        .await;
    Ok(())
}

/// Resolves on the first SIGINT. The handler is installed before returning so
/// an interrupt during the first cycle is not lost.
#[cfg(unix)]
fn shutdown_signal() -> Result<oneshot::Receiver<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt =
        signal(SignalKind::interrupt()).with_context(|| "Failed to listen for ctrl-c")?;
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        interrupt.recv().await;
        tracing::info!("Shutting down");
        let _ = tx.send(());
    });
    Ok(rx)
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<oneshot::Receiver<()>> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutting down");
        let _ = tx.send(());
    });
    Ok(rx)
}
