// ABOUTME: Application-wide error types for hoku.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::adapters::{AdapterError, DetectionError};
use crate::pipeline::{ErrorClass, LockError, PipelineError};
use crate::types::RevisionError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid revision: {0}")]
    InvalidRevision(#[from] RevisionError),

    #[error("gateway is not configured (add a `gateway` section)")]
    GatewayNotConfigured,

    #[error("gateway failed: {0}")]
    Gateway(String),

    #[error(transparent)]
    Runtime(#[from] DetectionError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("rollback failed: {0}")]
    Rollback(#[from] PipelineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Process exit code: failed rollbacks need an operator, anything else
    /// was rejected before touching the workload.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Rollback(e) if e.class() == ErrorClass::Fatal => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
