// ABOUTME: Shared types used across adapter trait definitions.
// ABOUTME: Checkout, BuildRequest, BuildLimits, DeploymentTarget, RolloutStatus.

use crate::types::{ImageRef, WorkloadName};
use std::fmt;
use std::path::PathBuf;

/// Where and what to check out.
#[derive(Debug, Clone)]
pub struct Checkout {
    /// Working copy path.
    pub path: PathBuf,
    /// Remote to fetch from.
    pub remote: String,
    /// Deployment branch.
    pub branch: String,
}

/// Resource ceiling for the build process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildLimits {
    /// Relative CPU weight (1024 = one full share).
    pub cpu_shares: u32,
    /// Memory ceiling in bytes.
    pub memory_bytes: u64,
}

/// A request to build one image.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Build context directory.
    pub context: PathBuf,
    /// Dockerfile, relative to the context. Engine default when `None`.
    pub dockerfile: Option<PathBuf>,
    /// Tag to give the result.
    pub tag: ImageRef,
    /// Resource ceiling.
    pub limits: BuildLimits,
}

/// The orchestrated workload the pipeline mutates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    /// Deployment name.
    pub name: WorkloadName,
    /// Namespace.
    pub namespace: String,
    /// Container within the pod template whose image is replaced.
    pub container: String,
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/deployment/{}", self.namespace, self.name)
    }
}

/// Result of waiting on a rollout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloutStatus {
    /// New generation fully available.
    Healthy,
    /// The bound elapsed before the rollout finished.
    TimedOut,
    /// The orchestrator reported the rollout as failed.
    Failed(String),
}
