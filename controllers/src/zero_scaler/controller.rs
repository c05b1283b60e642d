use std::{future::Future, sync::Arc, time::Duration};

use resources::config::ScalerConfig;
use tokio::{select, time::sleep};

use crate::{
    gateway::Gateway,
    idle::IdleDetector,
    metrics::MetricsSource,
    scaler::{ScaleOutcome, ScalingExecutor},
};

/// What a single polling cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub listed: usize,
    pub idle: usize,
    pub scaled: usize,
    pub dry_run: usize,
    /// Idle functions already at zero replicas
    pub skipped: usize,
    pub failed: usize,
}

pub struct ZeroScaler {
    gateway: Arc<dyn Gateway>,
    detector: IdleDetector,
    executor: ScalingExecutor,
    polling_frequency: Duration,
}

impl ZeroScaler {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        metrics: Arc<dyn MetricsSource>,
        config: &ScalerConfig,
    ) -> Self {
        Self {
            detector: IdleDetector::new(metrics, config),
            executor: ScalingExecutor::new(gateway.clone(), config.dry_run),
            gateway,
            polling_frequency: Duration::from_secs(config.polling_frequency),
        }
    }

    /// Poll once right away, then once every polling period until `shutdown`
    /// resolves. A cycle in progress always runs to completion, a shutdown
    /// requested meanwhile is honored right after it.
    pub async fn run<F: Future<Output = ()>>(&self, shutdown: F) {
        tokio::pin!(shutdown);

        tracing::info!("Running first polling");
        self.run_cycle().await;

        tracing::info!(
            "Starting polling loop, running every {} seconds",
            self.polling_frequency.as_secs()
        );
        loop {
            select! {
                _ = sleep(self.polling_frequency) => {},
                _ = &mut shutdown => break,
            }
            self.run_cycle().await;
        }

        tracing::info!("Zero scaler exited");
    }

    /// List, detect, scale. Never fails: errors are logged and end up as
    /// fewer scaled functions.
    pub async fn run_cycle(&self) -> CycleReport {
        tracing::info!("Polling functions");

        let functions = match self.gateway.list_functions().await {
            Ok(functions) => functions,
            Err(e) => {
                tracing::error!("Error listing functions: {:#}", e);
                Vec::new()
            },
        };
        let mut report = CycleReport {
            listed: functions.len(),
            ..Default::default()
        };

        let idle_functions = self.detector.detect_idle(functions).await;
        report.idle = idle_functions.len();
        tracing::debug!("{} of {} functions are idle", report.idle, report.listed);
        if idle_functions.is_empty() {
            tracing::info!("No idle functions found, stopping!");
            return report;
        }

        for function in &idle_functions {
            match self.executor.scale_to_zero(function).await {
                ScaleOutcome::Scaled => report.scaled += 1,
                ScaleOutcome::DryRun => report.dry_run += 1,
                ScaleOutcome::AlreadyZero => report.skipped += 1,
                ScaleOutcome::Failed => report.failed += 1,
            }
        }
        tracing::info!(
            "Finished polling functions, scaled: {}, dry run: {}, skipped: {}, failed: {}",
            report.scaled,
            report.dry_run,
            report.skipped,
            report.failed
        );
        report
    }
}
