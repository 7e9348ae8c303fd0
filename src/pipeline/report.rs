// ABOUTME: Run outcome, per-step records and the serializable run report.
// ABOUTME: The report is the only trace of a run; nothing is persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::diagnostics::Warning;

use super::error::{ErrorClass, PipelineError};
use super::stage::Stage;

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunOutcome {
    Deployed,
    Aborted,
    RolledBack,
    Fatal,
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Deployed => 0,
            RunOutcome::Aborted => 1,
            RunOutcome::RolledBack => 2,
            RunOutcome::Fatal => 3,
        }
    }

    pub fn is_success(self) -> bool {
        self == RunOutcome::Deployed
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunOutcome::Deployed => "deployed",
            RunOutcome::Aborted => "aborted",
            RunOutcome::RolledBack => "rolled-back",
            RunOutcome::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// One executed stage.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub stage: Stage,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    /// Exit code of the external command that failed, when known.
    pub exit_code: Option<i32>,
    pub message: String,
}

/// A classified failure as it appears in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub stage: Option<Stage>,
    pub class: ErrorClass,
    pub message: String,
}

impl Failure {
    pub fn from_error(stage: Stage, err: &PipelineError) -> Self {
        Self {
            stage: Some(stage),
            class: err.class(),
            message: err.to_string(),
        }
    }

    /// A run refused before its first stage.
    pub fn input(message: impl Into<String>) -> Self {
        Self {
            stage: None,
            class: ErrorClass::Input,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub workload: String,
    pub revision: String,
    /// Full commit id HEAD resolved to after sync.
    pub commit: Option<String>,
    /// Revision tag built by this run.
    pub image: String,
    /// Image the workload ran before Apply.
    pub previous_image: Option<String>,
    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepRecord>,
    pub warnings: Vec<Warning>,
    /// The failure that ended the forward path.
    pub failure: Option<Failure>,
    /// Set when the rollback itself failed.
    pub rollback_failure: Option<Failure>,
}

impl RunReport {
    pub fn new(workload: &str, revision: &str, image: &str) -> Self {
        let now = Utc::now();
        Self {
            workload: workload.to_string(),
            revision: revision.to_string(),
            commit: None,
            image: image.to_string(),
            previous_image: None,
            outcome: RunOutcome::Aborted,
            started_at: now,
            finished_at: now,
            steps: Vec::new(),
            warnings: Vec::new(),
            failure: None,
            rollback_failure: None,
        }
    }

    /// Report for a run that never started.
    pub fn rejected(workload: &str, revision: &str, image: &str, failure: Failure) -> Self {
        let mut report = Self::new(workload, revision, image);
        report.failure = Some(failure);
        report
    }

    pub(crate) fn finish(&mut self, outcome: RunOutcome) {
        self.outcome = outcome;
        self.finished_at = Utc::now();
    }

    /// The class that best explains the outcome.
    pub fn failure_class(&self) -> Option<ErrorClass> {
        self.rollback_failure
            .as_ref()
            .or(self.failure.as_ref())
            .map(|f| f.class)
    }

    /// One-line summary for logs and CLI output.
    pub fn summary(&self) -> String {
        let mut line = format!("{} {} {}", self.workload, self.image, self.outcome);
        if let Some(ref failure) = self.failure {
            line.push_str(&format!(": {}", failure.message));
        }
        if let Some(ref failure) = self.rollback_failure {
            line.push_str(&format!("; rollback: {}", failure.message));
        }
        line
    }

    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}
