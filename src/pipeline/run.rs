// ABOUTME: The pipeline run loop: execute a stage, record it, ask Stage::next.
// ABOUTME: Every stage runs under its own timeout; expiry follows its failure path.

use chrono::Utc;
use tracing::Instrument;

use crate::adapters::{Adapters, BuildRequest, RolloutStatus};
use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::tagging::{BackupOutcome, ImageSet, TagProtocol};
use crate::types::{CommitId, ImageId, Revision};

use super::error::PipelineError;
use super::report::{Failure, RunReport, StepRecord};
use super::rollback::revert;
use super::stage::{Stage, Transition};

/// Typed result of a successful stage.
#[derive(Debug)]
enum StepOutput {
    Synced(CommitId),
    BackedUp(BackupOutcome),
    Built,
    Verified(ImageId),
    Published,
    Applied,
    Healthy,
    Cleaned,
    Reverted(ImageId),
}

impl StepOutput {
    fn describe(&self) -> String {
        match self {
            StepOutput::Synced(commit) => format!("checked out {commit}"),
            StepOutput::BackedUp(BackupOutcome::NoPriorImage) => {
                "no latest image, first deployment".to_string()
            }
            StepOutput::BackedUp(BackupOutcome::AlreadyCurrent(id)) => {
                format!("latest already is {id}, stable kept")
            }
            StepOutput::BackedUp(BackupOutcome::BackedUp(id)) => format!("stable now {id}"),
            StepOutput::Built => "image built".to_string(),
            StepOutput::Verified(id) => format!("image {id} present"),
            StepOutput::Published => "revision and floating tags pushed".to_string(),
            StepOutput::Applied => "image applied".to_string(),
            StepOutput::Healthy => "rollout healthy".to_string(),
            StepOutput::Cleaned => "dangling images pruned".to_string(),
            StepOutput::Reverted(id) => format!("latest restored to {id}"),
        }
    }
}

/// Drives one workload from a revision to a terminal outcome.
pub struct Pipeline<'a> {
    config: &'a Config,
    adapters: &'a Adapters,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, adapters: &'a Adapters) -> Self {
        Self { config, adapters }
    }

    /// Run every stage for `revision`. Never panics on collaborator
    /// failure; the outcome is in the report.
    pub async fn run(&self, revision: &Revision) -> RunReport {
        let span = tracing::info_span!(
            "pipeline",
            workload = %self.config.workload,
            revision = revision.short(),
        );
        self.run_stages(revision).instrument(span).await
    }

    async fn run_stages(&self, revision: &Revision) -> RunReport {
        let images = ImageSet::new(&self.config.registry, &self.config.workload, revision);
        let mut report = RunReport::new(
            self.config.workload.as_str(),
            revision.as_str(),
            &images.commit.to_string(),
        );
        tracing::info!(image = %images.commit, "pipeline started");

        let mut diagnostics = Diagnostics::default();
        let mut stage = Stage::FIRST;
        loop {
            let started_at = Utc::now();
            let timeout = stage.timeout(&self.config.timeouts);
            let result =
                match tokio::time::timeout(timeout, self.execute(stage, revision, &images, &mut report))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(PipelineError::StepTimedOut { stage, timeout }),
                };
            let finished_at = Utc::now();
            let timed_out = matches!(result, Err(PipelineError::StepTimedOut { .. }));

            let succeeded = match result {
                Ok(output) => {
                    let message = output.describe();
                    tracing::info!(stage = %stage, success = true, message = %message, "step finished");
                    report.steps.push(StepRecord {
                        stage,
                        started_at,
                        finished_at,
                        success: true,
                        exit_code: None,
                        message,
                    });
                    true
                }
                Err(err) => {
                    let exit_code = err.exit_code();
                    tracing::warn!(
                        stage = %stage,
                        success = false,
                        exit_code = ?exit_code,
                        class = %err.class(),
                        message = %err,
                        "step failed"
                    );
                    report.steps.push(StepRecord {
                        stage,
                        started_at,
                        finished_at,
                        success: false,
                        exit_code,
                        message: err.to_string(),
                    });
                    absorb_failure(stage, &err, &mut report, &mut diagnostics);
                    stage.is_best_effort()
                }
            };

            let transition = match stage {
                Stage::Apply if !succeeded => {
                    let changed = self.apply_took_effect(&report, timed_out).await;
                    Transition::Next(Stage::after_failed_apply(changed))
                }
                _ => stage.next(succeeded),
            };
            match transition {
                Transition::Next(next) => stage = next,
                Transition::Finish(outcome) => {
                    report.warnings = diagnostics.into_warnings();
                    report.finish(outcome);
                    tracing::info!(outcome = %outcome, summary = %report.summary(), "pipeline finished");
                    return report;
                }
            }
        }
    }

    /// Whether a failed Apply still left the workload on a new image.
    ///
    /// When the running image cannot be re-read, a timed-out Apply is
    /// assumed to have landed and any other failure is assumed not to.
    async fn apply_took_effect(&self, report: &RunReport, timed_out: bool) -> bool {
        let Some(previous) = report.previous_image.as_deref() else {
            return false;
        };
        let target = self.config.target();
        let reread = tokio::time::timeout(
            self.config.timeouts.command,
            self.adapters.orchestrator.current_image(&target),
        )
        .await;

        match reread {
            Ok(Ok(current)) => {
                let changed = current.as_deref() != Some(previous);
                if changed {
                    tracing::warn!(
                        previous,
                        current = current.as_deref().unwrap_or("-"),
                        "apply failed after the workload image changed"
                    );
                }
                changed
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, assume_changed = timed_out, "could not re-read workload image");
                timed_out
            }
            Err(_) => {
                tracing::warn!(assume_changed = timed_out, "re-reading workload image timed out");
                timed_out
            }
        }
    }

    async fn execute(
        &self,
        stage: Stage,
        revision: &Revision,
        images: &ImageSet,
        report: &mut RunReport,
    ) -> Result<StepOutput, PipelineError> {
        let engine = self.adapters.images.as_ref();
        let orchestrator = self.adapters.orchestrator.as_ref();
        let tags = TagProtocol::new(engine, images.floating());

        match stage {
            Stage::Sync => {
                let commit = self
                    .adapters
                    .source
                    .sync(&self.config.checkout(), revision)
                    .await
                    .map_err(PipelineError::Sync)?;
                report.commit = Some(commit.to_string());
                Ok(StepOutput::Synced(commit))
            }
            Stage::Backup => tags
                .backup_current_as_stable(Some(&images.commit))
                .await
                .map(StepOutput::BackedUp)
                .map_err(PipelineError::Backup),
            Stage::Build => {
                let request = BuildRequest {
                    context: self.config.build_context(),
                    dockerfile: self.config.build.dockerfile.clone(),
                    tag: images.commit.clone(),
                    limits: self.config.build.resources.limits(),
                };
                engine.build(&request).await.map_err(PipelineError::Build)?;
                Ok(StepOutput::Built)
            }
            Stage::VerifyBuilt => match engine.inspect(&images.commit).await {
                Ok(Some(id)) => Ok(StepOutput::Verified(id)),
                Ok(None) => Err(PipelineError::ImageMissing(images.commit.to_string())),
                Err(e) => Err(PipelineError::Verify(e)),
            },
            Stage::Publish => {
                tags.publish(&images.commit)
                    .await
                    .map_err(PipelineError::Publish)?;
                Ok(StepOutput::Published)
            }
            Stage::Apply => {
                let target = self.config.target();
                report.previous_image = orchestrator
                    .current_image(&target)
                    .await
                    .map_err(PipelineError::Apply)?;
                orchestrator
                    .set_image(&target, &images.commit)
                    .await
                    .map_err(PipelineError::Apply)?;
                Ok(StepOutput::Applied)
            }
            Stage::AwaitHealth => {
                let health = self.config.timeouts.health;
                match orchestrator.rollout_status(&self.config.target(), health).await {
                    Ok(RolloutStatus::Healthy) => Ok(StepOutput::Healthy),
                    Ok(RolloutStatus::TimedOut) => Err(PipelineError::HealthTimeout(health)),
                    Ok(RolloutStatus::Failed(reason)) => Err(PipelineError::Unhealthy(reason)),
                    Err(e) => Err(PipelineError::HealthCheck(e)),
                }
            }
            Stage::Cleanup => {
                engine.prune(true).await.map_err(PipelineError::Cleanup)?;
                Ok(StepOutput::Cleaned)
            }
            Stage::Rollback(cause) => revert(
                engine,
                orchestrator,
                &self.config.target(),
                images.floating(),
                cause.workload_mutated(),
            )
            .await
            .map(StepOutput::Reverted),
        }
    }
}

fn absorb_failure(
    stage: Stage,
    err: &PipelineError,
    report: &mut RunReport,
    diagnostics: &mut Diagnostics,
) {
    if stage.is_best_effort() {
        diagnostics.warn(Warning::for_stage(stage, err.to_string()));
    } else if matches!(stage, Stage::Rollback(_)) {
        report.rollback_failure = Some(Failure::from_error(stage, err));
    } else {
        report.failure = Some(Failure::from_error(stage, err));
    }
}
