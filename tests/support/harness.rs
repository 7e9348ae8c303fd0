// ABOUTME: Pipeline harness wiring a config to the in-memory adapters.
// ABOUTME: Lets tests run revisions and inspect registry and cluster state.

use hoku::adapters::Adapters;
use hoku::config::Config;
use hoku::pipeline::{Pipeline, RunReport};
use hoku::types::{ImageRef, Revision};
use std::sync::Arc;

use super::fakes::{FakeCluster, FakeEngine, FakeSource};

pub const BOOTSTRAP_IMAGE: &str = "nginx:bootstrap";

pub const CONFIG_YAML: &str = r#"
workload: shop
namespace: prod
registry: localhost:5000
source:
  path: /srv/shop
timeouts:
  health: 5m
"#;

pub struct Harness {
    pub config: Config,
    pub source: Arc<FakeSource>,
    pub engine: Arc<FakeEngine>,
    pub cluster: Arc<FakeCluster>,
    pub adapters: Adapters,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::from_yaml(CONFIG_YAML).unwrap())
    }

    pub fn with_config(config: Config) -> Self {
        let source = Arc::new(FakeSource::default());
        let engine = Arc::new(FakeEngine::default());
        let cluster = Arc::new(FakeCluster::new(BOOTSTRAP_IMAGE));
        let adapters = Adapters {
            source: source.clone(),
            images: engine.clone(),
            orchestrator: cluster.clone(),
        };
        Self {
            config,
            source,
            engine,
            cluster,
            adapters,
        }
    }

    pub async fn run(&self, revision: &str) -> RunReport {
        let revision = Revision::parse(revision).unwrap();
        Pipeline::new(&self.config, &self.adapters)
            .run(&revision)
            .await
    }

    pub fn image(&self, tag: &str) -> ImageRef {
        ImageRef::new(&self.config.registry, &self.config.workload, tag)
    }

    /// What the registry's tag points at.
    pub fn registry(&self, tag: &str) -> Option<String> {
        self.engine.registry_id(&self.image(tag))
    }

    /// What the local engine's tag points at.
    pub fn local(&self, tag: &str) -> Option<String> {
        self.engine.local_id(&self.image(tag))
    }

    /// Tag as the cluster sees it, e.g. `localhost:5000/shop:a1b2c3d`.
    pub fn reference(&self, tag: &str) -> String {
        self.image(tag).to_string()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
