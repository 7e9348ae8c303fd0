// ABOUTME: Pipeline error types and the failure taxonomy.
// ABOUTME: Every error maps to an ErrorClass that decides abort, rollback or fatal.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::adapters::AdapterError;
use crate::tagging::TagError;

use super::stage::Stage;

/// Failure taxonomy for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorClass {
    /// Rejected before the pipeline started: bad revision, config, lock, hook.
    Input,
    /// Sync, Build or Verify-Built failed; nothing outside the host changed.
    LocalFailure,
    /// Registry tag or push failed after a successful build.
    PublishFailure,
    /// The orchestrator refused the new image.
    ApplyFailure,
    /// The new revision never became healthy.
    HealthFailure,
    /// Rollback could not complete; manual intervention required.
    Fatal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorClass::Input => "input",
            ErrorClass::LocalFailure => "local-failure",
            ErrorClass::PublishFailure => "publish-failure",
            ErrorClass::ApplyFailure => "apply-failure",
            ErrorClass::HealthFailure => "health-failure",
            ErrorClass::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// Errors raised by pipeline stages.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("source sync failed: {0}")]
    Sync(#[source] AdapterError),

    #[error("backup of latest failed: {0}")]
    Backup(#[source] AdapterError),

    #[error("image build failed: {0}")]
    Build(#[source] AdapterError),

    #[error("built image {0} is not present locally")]
    ImageMissing(String),

    #[error("could not inspect built image: {0}")]
    Verify(#[source] AdapterError),

    #[error("publishing to registry failed: {0}")]
    Publish(#[source] AdapterError),

    #[error("applying new image failed: {0}")]
    Apply(#[source] AdapterError),

    #[error("rollout failed: {0}")]
    Unhealthy(String),

    #[error("rollout not healthy within {}s", .0.as_secs())]
    HealthTimeout(Duration),

    #[error("could not read rollout status: {0}")]
    HealthCheck(#[source] AdapterError),

    #[error("cleanup failed: {0}")]
    Cleanup(#[source] AdapterError),

    #[error("rollout undo failed: {0}")]
    Undo(#[source] AdapterError),

    #[error("no stable image exists for {0}; nothing to roll back to")]
    NoStableImage(String),

    #[error("restoring latest from stable failed: {0}")]
    RestoreTags(#[source] AdapterError),

    #[error("{stage} did not finish within {}s", timeout.as_secs())]
    StepTimedOut { stage: Stage, timeout: Duration },
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::Sync(_)
            | PipelineError::Backup(_)
            | PipelineError::Build(_)
            | PipelineError::ImageMissing(_)
            | PipelineError::Verify(_)
            | PipelineError::Cleanup(_) => ErrorClass::LocalFailure,
            PipelineError::Publish(_) => ErrorClass::PublishFailure,
            PipelineError::Apply(_) => ErrorClass::ApplyFailure,
            PipelineError::Unhealthy(_)
            | PipelineError::HealthTimeout(_)
            | PipelineError::HealthCheck(_) => ErrorClass::HealthFailure,
            PipelineError::Undo(_)
            | PipelineError::NoStableImage(_)
            | PipelineError::RestoreTags(_) => ErrorClass::Fatal,
            PipelineError::StepTimedOut { stage, .. } => stage.failure_class(),
        }
    }

    /// Exit code of the external command behind this error, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            PipelineError::Sync(e)
            | PipelineError::Backup(e)
            | PipelineError::Build(e)
            | PipelineError::Verify(e)
            | PipelineError::Publish(e)
            | PipelineError::Apply(e)
            | PipelineError::HealthCheck(e)
            | PipelineError::Cleanup(e)
            | PipelineError::Undo(e)
            | PipelineError::RestoreTags(e) => e.exit_code(),
            _ => None,
        }
    }
}

impl From<TagError> for PipelineError {
    fn from(err: TagError) -> Self {
        match err {
            TagError::NoStableImage(image) => PipelineError::NoStableImage(image),
            TagError::Engine(e) => PipelineError::RestoreTags(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RollbackCause;

    #[test]
    fn timeout_takes_class_of_its_stage() {
        let err = PipelineError::StepTimedOut {
            stage: Stage::Build,
            timeout: Duration::from_secs(60),
        };
        assert_eq!(err.class(), ErrorClass::LocalFailure);

        let err = PipelineError::StepTimedOut {
            stage: Stage::Rollback(RollbackCause::Unhealthy),
            timeout: Duration::from_secs(60),
        };
        assert_eq!(err.class(), ErrorClass::Fatal);
        assert_eq!(err.to_string(), "rollback did not finish within 60s");
    }

    #[test]
    fn missing_stable_is_fatal() {
        let err: PipelineError = TagError::NoStableImage("r/app:stable".into()).into();
        assert_eq!(err.class(), ErrorClass::Fatal);
    }

    #[test]
    fn exit_code_comes_from_the_command() {
        let err = PipelineError::Publish(AdapterError::failed("docker push", 125, "denied"));
        assert_eq!(err.exit_code(), Some(125));
        assert_eq!(PipelineError::Unhealthy("crash".into()).exit_code(), None);
    }
}
