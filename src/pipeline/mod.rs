// ABOUTME: Deployment pipeline as an explicit state machine.
// ABOUTME: Sync, Backup, Build, Verify-Built, Publish, Apply, Await-Health, then Cleanup or Rollback.

mod error;
mod lock;
mod report;
mod rollback;
mod run;
mod stage;

pub use error::{ErrorClass, PipelineError};
pub use lock::{LockError, LockInfo, RunLock};
pub use report::{Failure, RunOutcome, RunReport, StepRecord};
pub use rollback::manual_rollback;
pub use run::Pipeline;
pub use stage::{RollbackCause, Stage, Transition};
