// ABOUTME: Image build configuration.
// ABOUTME: Context, Dockerfile and the resource ceiling the build process runs under.

use serde::Deserialize;
use std::path::PathBuf;

use super::deserialize::deserialize_memory;
use crate::adapters::BuildLimits;

#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    /// Build context, relative to the source path.
    #[serde(default = "default_context")]
    pub context: PathBuf,

    /// Dockerfile, relative to the context.
    #[serde(default)]
    pub dockerfile: Option<PathBuf>,

    #[serde(default)]
    pub resources: BuildResources,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            context: default_context(),
            dockerfile: None,
            resources: BuildResources::default(),
        }
    }
}

fn default_context() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildResources {
    #[serde(default = "default_cpu_shares")]
    pub cpu_shares: u32,

    #[serde(default = "default_memory", deserialize_with = "deserialize_memory")]
    pub memory: u64,
}

impl Default for BuildResources {
    fn default() -> Self {
        BuildResources {
            cpu_shares: default_cpu_shares(),
            memory: default_memory(),
        }
    }
}

impl BuildResources {
    pub fn limits(&self) -> BuildLimits {
        BuildLimits {
            cpu_shares: self.cpu_shares,
            memory_bytes: self.memory,
        }
    }
}

fn default_cpu_shares() -> u32 {
    512
}

fn default_memory() -> u64 {
    2 * 1024 * 1024 * 1024
}
