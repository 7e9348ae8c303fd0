// ABOUTME: Pipeline stages and the single dispatcher deciding what runs next.
// ABOUTME: Linear happy path with a Rollback fallback after the workload is touched.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::config::Timeouts;

use super::error::ErrorClass;
use super::report::RunOutcome;

/// Why the Rollback stage was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RollbackCause {
    /// The set-image request failed; the workload spec was not changed.
    ApplyFailed,
    /// The set-image request failed or timed out after the workload spec
    /// had already changed.
    ApplyInterrupted,
    /// The new revision did not become healthy.
    Unhealthy,
}

impl RollbackCause {
    /// Whether the orchestrator must be asked to undo its last rollout.
    pub fn workload_mutated(self) -> bool {
        matches!(self, RollbackCause::ApplyInterrupted | RollbackCause::Unhealthy)
    }

    /// Outcome when the rollback itself completes.
    pub fn outcome(self) -> RunOutcome {
        match self {
            RollbackCause::ApplyFailed => RunOutcome::Aborted,
            RollbackCause::ApplyInterrupted | RollbackCause::Unhealthy => RunOutcome::RolledBack,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Sync,
    Backup,
    Build,
    VerifyBuilt,
    Publish,
    Apply,
    AwaitHealth,
    Cleanup,
    Rollback(RollbackCause),
}

/// Decision taken after a stage finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Next(Stage),
    Finish(RunOutcome),
}

impl Stage {
    pub const FIRST: Stage = Stage::Sync;

    /// The dispatcher. `succeeded` is the stage's own result; best-effort
    /// stages move on regardless. A failed Apply assumes the workload was
    /// left alone; see [`Stage::after_failed_apply`].
    pub fn next(self, succeeded: bool) -> Transition {
        use Transition::{Finish, Next};

        match (self, succeeded) {
            (Stage::Sync, true) => Next(Stage::Backup),
            (Stage::Backup, _) => Next(Stage::Build),
            (Stage::Build, true) => Next(Stage::VerifyBuilt),
            (Stage::VerifyBuilt, true) => Next(Stage::Publish),
            (Stage::Publish, true) => Next(Stage::Apply),
            (Stage::Apply, true) => Next(Stage::AwaitHealth),
            (Stage::Apply, false) => Next(Stage::Rollback(RollbackCause::ApplyFailed)),
            (Stage::AwaitHealth, true) => Next(Stage::Cleanup),
            (Stage::AwaitHealth, false) => Next(Stage::Rollback(RollbackCause::Unhealthy)),
            (Stage::Cleanup, _) => Finish(RunOutcome::Deployed),
            (Stage::Rollback(cause), true) => Finish(cause.outcome()),
            (Stage::Rollback(_), false) => Finish(RunOutcome::Fatal),
            (Stage::Sync | Stage::Build | Stage::VerifyBuilt | Stage::Publish, false) => {
                Finish(RunOutcome::Aborted)
            }
        }
    }

    /// Where a failed Apply goes once the running image has been re-read.
    pub fn after_failed_apply(workload_changed: bool) -> Stage {
        if workload_changed {
            Stage::Rollback(RollbackCause::ApplyInterrupted)
        } else {
            Stage::Rollback(RollbackCause::ApplyFailed)
        }
    }

    /// Worst-case wall time of one run: every forward stage up to health,
    /// then the rollback, each at its full bound.
    pub fn worst_case(timeouts: &Timeouts) -> Duration {
        [
            Stage::Sync,
            Stage::Backup,
            Stage::Build,
            Stage::VerifyBuilt,
            Stage::Publish,
            Stage::Apply,
            Stage::AwaitHealth,
            Stage::Rollback(RollbackCause::Unhealthy),
        ]
        .into_iter()
        .map(|stage| stage.timeout(timeouts))
        .sum::<Duration>()
            + timeouts.command
    }

    /// Failures here become warnings and never change the outcome.
    pub fn is_best_effort(self) -> bool {
        matches!(self, Stage::Backup | Stage::Cleanup)
    }

    /// Class of a failure raised by this stage.
    pub fn failure_class(self) -> ErrorClass {
        match self {
            Stage::Sync | Stage::Backup | Stage::Build | Stage::VerifyBuilt | Stage::Cleanup => {
                ErrorClass::LocalFailure
            }
            Stage::Publish => ErrorClass::PublishFailure,
            Stage::Apply => ErrorClass::ApplyFailure,
            Stage::AwaitHealth => ErrorClass::HealthFailure,
            Stage::Rollback(_) => ErrorClass::Fatal,
        }
    }

    /// Outer bound on the whole stage.
    ///
    /// Await-Health gets the command bound on top of the health bound so the
    /// orchestrator's own timeout answers first.
    pub fn timeout(self, timeouts: &Timeouts) -> Duration {
        match self {
            Stage::Sync => timeouts.sync,
            Stage::Backup | Stage::Publish => timeouts.publish,
            Stage::Build => timeouts.build,
            Stage::VerifyBuilt | Stage::Cleanup => timeouts.command,
            Stage::Apply => timeouts.apply,
            Stage::AwaitHealth => timeouts.health + timeouts.command,
            Stage::Rollback(_) => timeouts.rollback,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Sync => "sync",
            Stage::Backup => "backup",
            Stage::Build => "build",
            Stage::VerifyBuilt => "verify-built",
            Stage::Publish => "publish",
            Stage::Apply => "apply",
            Stage::AwaitHealth => "await-health",
            Stage::Cleanup => "cleanup",
            Stage::Rollback(_) => "rollback",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
