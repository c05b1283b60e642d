use std::sync::Arc;

use anyhow::Result;
use resources::{models::ScaleServiceRequest, objects::function::FunctionStatus};

use crate::gateway::Gateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleOutcome {
    /// The gateway accepted the scale command
    Scaled,
    /// Dry run, nothing was sent
    DryRun,
    /// No replicas left to remove
    AlreadyZero,
    Failed,
}

pub struct ScalingExecutor {
    gateway: Arc<dyn Gateway>,
    dry_run: bool,
}

impl ScalingExecutor {
    pub fn new(gateway: Arc<dyn Gateway>, dry_run: bool) -> Self {
        Self {
            gateway,
            dry_run,
        }
    }

    pub async fn scale(&self, name: &str, replicas: u64) -> Result<()> {
        if self.dry_run {
            tracing::info!("*DRY RUN*");
            tracing::info!("Would be scaling {} replicas to {}", name, replicas);
            return Ok(());
        }

        tracing::info!("Scaling {} replicas to {}", name, replicas);
        self.gateway
            .scale_function(&ScaleServiceRequest::new(name, replicas))
            .await
    }

    /// Scale an idle function down. Failures are logged and stay with this
    /// function.
    pub async fn scale_to_zero(&self, function: &FunctionStatus) -> ScaleOutcome {
        if function.replicas == 0 {
            tracing::debug!("Function {} is already scaled to zero", function.name);
            return ScaleOutcome::AlreadyZero;
        }
        match self.scale(&function.name, 0).await {
            Ok(_) if self.dry_run => ScaleOutcome::DryRun,
            Ok(_) => ScaleOutcome::Scaled,
            Err(e) => {
                tracing::error!("Error scaling {}: {:#}", function.name, e);
                ScaleOutcome::Failed
            },
        }
    }
}
