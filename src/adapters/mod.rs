// ABOUTME: Adapters for the pipeline's external collaborators.
// ABOUTME: git for source, docker/podman for images, kubectl for the orchestrator.

mod command;
mod detection;
mod engine;
mod error;
mod git;
mod kubectl;
mod traits;
mod types;

use std::sync::Arc;

pub use command::{Cmd, CommandOutput, DEFAULT_TIMEOUT};
pub use detection::{DetectionError, detect_runtime};
pub use engine::CliImageEngine;
pub use error::{AdapterError, AdapterErrorKind};
pub use git::GitSource;
pub use kubectl::Kubectl;
pub use traits::*;
pub use types::{RuntimeInfo, RuntimeType};

use crate::config::Config;

/// The three collaborators a pipeline run drives.
#[derive(Clone)]
pub struct Adapters {
    pub source: Arc<dyn SourceOps>,
    pub images: Arc<dyn ImageOps>,
    pub orchestrator: Arc<dyn OrchestratorOps>,
}

impl Adapters {
    /// Real CLI-backed adapters, bounded by the configured timeouts.
    pub fn from_config(config: &Config) -> Result<Self, DetectionError> {
        let runtime = detect_runtime(config.runtime)?;
        tracing::info!(runtime = runtime.runtime_type.binary(), "using image engine");

        let timeouts = &config.timeouts;
        let engine = CliImageEngine::new(runtime.runtime_type)
            .command_timeout(timeouts.command)
            .build_timeout(timeouts.build)
            .push_timeout(timeouts.publish)
            .insecure_registry(config.insecure_registry);
        let kubectl = Kubectl::new(config.orchestrator.binary.clone())
            .context(config.orchestrator.context.clone())
            .timeout(timeouts.command);

        Ok(Self {
            source: Arc::new(GitSource::new(timeouts.sync)),
            images: Arc::new(engine),
            orchestrator: Arc::new(kubectl),
        })
    }
}
