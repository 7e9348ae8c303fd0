// ABOUTME: Reverting a workload: orchestrator undo, then latest restored from stable.
// ABOUTME: Shared by the pipeline's Rollback stage and the operator-invoked rollback.

use crate::adapters::{Adapters, DeploymentTarget, ImageOps, OrchestratorOps};
use crate::config::Config;
use crate::tagging::{FloatingTags, TagProtocol};
use crate::types::ImageId;

use super::error::PipelineError;

/// Undo the last rollout when `undo` is set, then point `latest` back at
/// `stable`. A failed undo skips the tag restore.
pub(crate) async fn revert(
    images: &dyn ImageOps,
    orchestrator: &dyn OrchestratorOps,
    target: &DeploymentTarget,
    tags: FloatingTags,
    undo: bool,
) -> Result<ImageId, PipelineError> {
    if undo {
        orchestrator
            .rollout_undo(target)
            .await
            .map_err(PipelineError::Undo)?;
        tracing::info!(target = %target, "rollout undone");
    } else {
        tracing::info!(target = %target, "workload was not changed, skipping undo");
    }

    let restored = TagProtocol::new(images, tags)
        .restore_stable_to_latest()
        .await?;
    Ok(restored)
}

/// Operator-invoked rollback of the current rollout.
///
/// Runs under the rollback timeout like the pipeline's own Rollback stage.
pub async fn manual_rollback(
    config: &Config,
    adapters: &Adapters,
) -> Result<ImageId, PipelineError> {
    let target = config.target();
    let tags = FloatingTags::new(&config.registry, &config.workload);
    let timeout = config.timeouts.rollback;

    tracing::info!(target = %target, "manual rollback requested");
    let restore = revert(
        adapters.images.as_ref(),
        adapters.orchestrator.as_ref(),
        &target,
        tags,
        true,
    );

    match tokio::time::timeout(timeout, restore).await {
        Ok(result) => result,
        Err(_) => Err(PipelineError::StepTimedOut {
            stage: super::Stage::Rollback(super::RollbackCause::Unhealthy),
            timeout,
        }),
    }
}
