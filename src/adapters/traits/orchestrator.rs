// ABOUTME: Orchestrator operations trait.
// ABOUTME: Read, update, watch and undo the rollout of a deployment target.

use super::shared_types::{DeploymentTarget, RolloutStatus};
use crate::adapters::AdapterError;
use crate::types::ImageRef;
use async_trait::async_trait;
use std::time::Duration;

/// Control-plane operations on an externally owned workload.
#[async_trait]
pub trait OrchestratorOps: Send + Sync {
    /// Image the target's container currently runs, if it can be determined.
    async fn current_image(&self, target: &DeploymentTarget)
    -> Result<Option<String>, AdapterError>;

    /// Point the target's container at `image`, starting a rollout.
    async fn set_image(
        &self,
        target: &DeploymentTarget,
        image: &ImageRef,
    ) -> Result<(), AdapterError>;

    /// Block until the rollout is fully available, fails, or `timeout` elapses.
    async fn rollout_status(
        &self,
        target: &DeploymentTarget,
        timeout: Duration,
    ) -> Result<RolloutStatus, AdapterError>;

    /// Revert the target to its previous generation.
    async fn rollout_undo(&self, target: &DeploymentTarget) -> Result<(), AdapterError>;
}
