// ABOUTME: DNS-compatible workload name validation.
// ABOUTME: The name doubles as the orchestrator deployment name and the image repository.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkloadNameError {
    #[error("workload name cannot be empty")]
    Empty,

    #[error("workload name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("workload name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("workload name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("workload name must be lowercase")]
    NotLowercase,

    #[error("invalid character in workload name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct WorkloadName(String);

impl WorkloadName {
    pub fn new(value: &str) -> Result<Self, WorkloadNameError> {
        if value.is_empty() {
            return Err(WorkloadNameError::Empty);
        }

        if value.len() > 63 {
            return Err(WorkloadNameError::TooLong);
        }

        if value.starts_with('-') {
            return Err(WorkloadNameError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(WorkloadNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(WorkloadNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(WorkloadNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkloadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
