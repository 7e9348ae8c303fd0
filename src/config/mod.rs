// ABOUTME: Configuration types and parsing for hoku.yml.
// ABOUTME: One immutable Config value carries every workload parameter into the pipeline.

mod build;
mod deserialize;
mod env_value;
mod gateway;
mod init;
mod timeouts;

pub use build::{BuildConfig, BuildResources};
pub use deserialize::parse_memory_string;
pub use env_value::EnvValue;
pub use gateway::GatewayConfig;
pub use init::init_config;
pub use timeouts::Timeouts;

use deserialize::{deserialize_registry, deserialize_workload_name};

use crate::adapters::{Checkout, DeploymentTarget, RuntimeType};
use crate::error::{Error, Result};
use crate::types::{Registry, WorkloadName};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "hoku.yml";
pub const CONFIG_FILENAME_ALT: &str = "hoku.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".hoku/config.yml";

/// Base directory for lock files, relative to `$HOME` (XDG state dir).
const STATE_DIR: &str = ".local/state/hoku";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_workload_name")]
    pub workload: WorkloadName,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Container to update; defaults to the workload name.
    #[serde(default)]
    pub container: Option<String>,

    #[serde(deserialize_with = "deserialize_registry")]
    pub registry: Registry,

    #[serde(default)]
    pub insecure_registry: bool,

    pub source: SourceConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub runtime: Option<RuntimeType>,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(default)]
    pub gateway: Option<GatewayConfig>,

    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default = "default_remote")]
    pub remote: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_kubectl")]
    pub binary: String,

    /// kubeconfig context; the current context when absent.
    #[serde(default)]
    pub context: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            binary: default_kubectl(),
            context: None,
        }
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_kubectl() -> String {
    "kubectl".to_string()
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file. A relative source path is resolved against the
    /// project directory: the file's directory, or its parent for
    /// `.hoku/config.yml`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        let project_dir = match path.parent() {
            Some(dir) if dir.ends_with(".hoku") => dir.parent(),
            other => other,
        };
        if config.source.path.is_relative()
            && let Some(dir) = project_dir
        {
            config.source.path = dir.join(&config.source.path);
        }
        Ok(config)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(Error::InvalidConfig("namespace cannot be empty".to_string()));
        }
        if self.source.branch.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "source.branch cannot be empty".to_string(),
            ));
        }
        if self.container.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(Error::InvalidConfig("container cannot be empty".to_string()));
        }
        if self.build.resources.cpu_shares == 0 {
            return Err(Error::InvalidConfig(
                "build.resources.cpu_shares must be positive".to_string(),
            ));
        }
        if let Some(ref gateway) = self.gateway
            && !gateway.path.starts_with('/')
        {
            return Err(Error::InvalidConfig(format!(
                "gateway.path must start with '/': {}",
                gateway.path
            )));
        }
        Ok(())
    }

    /// Container within the deployment whose image is replaced.
    pub fn container_name(&self) -> &str {
        self.container
            .as_deref()
            .unwrap_or_else(|| self.workload.as_str())
    }

    pub fn target(&self) -> DeploymentTarget {
        DeploymentTarget {
            name: self.workload.clone(),
            namespace: self.namespace.clone(),
            container: self.container_name().to_string(),
        }
    }

    pub fn checkout(&self) -> Checkout {
        Checkout {
            path: self.source.path.clone(),
            remote: self.source.remote.clone(),
            branch: self.source.branch.clone(),
        }
    }

    /// Build context as an absolute path inside the working copy.
    pub fn build_context(&self) -> PathBuf {
        self.source.path.join(&self.build.context)
    }

    /// Directory holding per-workload lock files.
    pub fn state_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.state_dir {
            return Ok(dir.clone());
        }
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(STATE_DIR))
            .ok_or_else(|| {
                Error::InvalidConfig("state_dir is not set and $HOME is unavailable".to_string())
            })
    }

    pub fn template() -> Self {
        Config {
            workload: WorkloadName::new("my-app").expect("template workload name is valid"),
            namespace: default_namespace(),
            container: None,
            registry: Registry::new("localhost:5000").expect("template registry is valid"),
            insecure_registry: false,
            source: SourceConfig {
                path: PathBuf::from("/srv/my-app"),
                branch: default_branch(),
                remote: default_remote(),
            },
            build: BuildConfig::default(),
            runtime: None,
            orchestrator: OrchestratorConfig::default(),
            timeouts: Timeouts::default(),
            gateway: None,
            state_dir: None,
        }
    }
}
