// ABOUTME: Adapter error types with SNAFU pattern.
// ABOUTME: Every external command failure carries the command line and exit code.

use snafu::Snafu;
use std::path::PathBuf;
use std::time::Duration;

/// Failure of an external collaborator (git, image engine, orchestrator).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum AdapterError {
    #[snafu(display("failed to start `{program}`: {source}"))]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[snafu(display("`{command}` exited with code {code}: {stderr}"))]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },

    #[snafu(display("`{command}` timed out after {}s", timeout.as_secs()))]
    TimedOut { command: String, timeout: Duration },

    #[snafu(display("`{command}` was terminated by a signal"))]
    Killed { command: String },

    #[snafu(display("unexpected output from `{command}`: {detail}"))]
    UnexpectedOutput { command: String, detail: String },

    #[snafu(display("{} is not a git working copy", path.display()))]
    NotWorkingCopy { path: PathBuf },

    #[snafu(display("checked out {resolved}, expected revision {expected}"))]
    RevisionMismatch { expected: String, resolved: String },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterErrorKind {
    /// The tool could not be started at all.
    Unavailable,
    /// The tool ran and reported failure.
    CommandFailed,
    /// The tool did not finish within its bound.
    TimedOut,
    /// The tool's output or resulting state was not what was asked for.
    InvalidState,
}

impl AdapterError {
    pub fn kind(&self) -> AdapterErrorKind {
        match self {
            AdapterError::Spawn { .. } => AdapterErrorKind::Unavailable,
            AdapterError::NonZeroExit { .. } | AdapterError::Killed { .. } => {
                AdapterErrorKind::CommandFailed
            }
            AdapterError::TimedOut { .. } => AdapterErrorKind::TimedOut,
            AdapterError::UnexpectedOutput { .. }
            | AdapterError::NotWorkingCopy { .. }
            | AdapterError::RevisionMismatch { .. } => AdapterErrorKind::InvalidState,
        }
    }

    /// Exit code of the external command, when it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            AdapterError::NonZeroExit { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Build an error for tests and in-memory adapters.
    pub fn failed(command: impl Into<String>, code: i32, stderr: impl Into<String>) -> Self {
        AdapterError::NonZeroExit {
            command: command.into(),
            code,
            stderr: stderr.into(),
        }
    }
}
