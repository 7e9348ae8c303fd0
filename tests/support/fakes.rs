// ABOUTME: In-memory implementations of the source, image and orchestrator traits.
// ABOUTME: Failures are switched on per test; state is inspectable after a run.

use async_trait::async_trait;
use hoku::adapters::{
    AdapterError, BuildRequest, Checkout, DeploymentTarget, ImageOps, OrchestratorOps,
    RolloutStatus, SourceOps,
};
use hoku::types::{CommitId, ImageId, ImageRef, Revision};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeSource {
    fail: Mutex<bool>,
    synced: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn fail(&self) {
        *self.fail.lock() = true;
    }

    pub fn synced(&self) -> Vec<String> {
        self.synced.lock().clone()
    }
}

#[async_trait]
impl SourceOps for FakeSource {
    async fn sync(
        &self,
        checkout: &Checkout,
        revision: &Revision,
    ) -> Result<CommitId, AdapterError> {
        if *self.fail.lock() {
            return Err(AdapterError::NotWorkingCopy {
                path: checkout.path.clone(),
            });
        }
        self.synced.lock().push(revision.as_str().to_string());
        Ok(CommitId::new(format!("{:0<40}", revision.as_str())))
    }
}

// ---------------------------------------------------------------------------
// Image engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineFailure {
    Build,
    /// Build "succeeds" but leaves no image behind.
    LoseBuild,
    HangBuild,
    Push,
    /// Only pushes of the `latest` tag fail.
    PushLatest,
    Pull,
    Prune,
}

#[derive(Default)]
struct EngineState {
    local: HashMap<String, String>,
    registry: HashMap<String, String>,
    builds: Vec<String>,
}

/// Image IDs are derived from the revision tag so rebuilds are reproducible.
#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<EngineState>,
    failures: Mutex<HashSet<EngineFailure>>,
}

impl FakeEngine {
    pub fn fail(&self, failure: EngineFailure) {
        self.failures.lock().insert(failure);
    }

    pub fn heal(&self) {
        self.failures.lock().clear();
    }

    fn failing(&self, failure: EngineFailure) -> bool {
        self.failures.lock().contains(&failure)
    }

    /// The ID a build of `tag` produces.
    pub fn build_id(tag: &str) -> String {
        format!("sha256:build-{tag}")
    }

    pub fn local_id(&self, image: &ImageRef) -> Option<String> {
        self.state.lock().local.get(&image.to_string()).cloned()
    }

    pub fn registry_id(&self, image: &ImageRef) -> Option<String> {
        self.state.lock().registry.get(&image.to_string()).cloned()
    }

    pub fn registry_snapshot(&self) -> HashMap<String, String> {
        self.state.lock().registry.clone()
    }

    pub fn builds(&self) -> Vec<String> {
        self.state.lock().builds.clone()
    }

    /// Forget every local image, as on a freshly provisioned host.
    pub fn clear_local(&self) {
        self.state.lock().local.clear();
    }
}

#[async_trait]
impl ImageOps for FakeEngine {
    async fn build(&self, request: &BuildRequest) -> Result<(), AdapterError> {
        if self.failing(EngineFailure::HangBuild) {
            std::future::pending::<()>().await;
        }
        if self.failing(EngineFailure::Build) {
            return Err(AdapterError::failed(
                "docker build",
                1,
                "failed to solve: exit code 2",
            ));
        }
        let tag = request.tag.tag().to_string();
        let mut state = self.state.lock();
        state.builds.push(tag.clone());
        if !self.failing(EngineFailure::LoseBuild) {
            state
                .local
                .insert(request.tag.to_string(), Self::build_id(&tag));
        }
        Ok(())
    }

    async fn tag(&self, source: &ImageRef, target: &ImageRef) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        let Some(id) = state.local.get(&source.to_string()).cloned() else {
            return Err(AdapterError::failed(
                "docker tag",
                1,
                format!("No such image: {source}"),
            ));
        };
        state.local.insert(target.to_string(), id);
        Ok(())
    }

    async fn untag(&self, image: &ImageRef) -> Result<(), AdapterError> {
        self.state.lock().local.remove(&image.to_string());
        Ok(())
    }

    async fn push(&self, image: &ImageRef) -> Result<(), AdapterError> {
        let latest_only = self.failing(EngineFailure::PushLatest) && image.tag() == "latest";
        if self.failing(EngineFailure::Push) || latest_only {
            return Err(AdapterError::failed(
                "docker push",
                1,
                "connection refused",
            ));
        }
        let mut state = self.state.lock();
        let Some(id) = state.local.get(&image.to_string()).cloned() else {
            return Err(AdapterError::failed(
                "docker push",
                1,
                format!("An image does not exist locally with the tag: {image}"),
            ));
        };
        state.registry.insert(image.to_string(), id);
        Ok(())
    }

    async fn pull(&self, image: &ImageRef) -> Result<bool, AdapterError> {
        if self.failing(EngineFailure::Pull) {
            return Err(AdapterError::failed("docker pull", 1, "registry unavailable"));
        }
        let mut state = self.state.lock();
        match state.registry.get(&image.to_string()).cloned() {
            Some(id) => {
                state.local.insert(image.to_string(), id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn inspect(&self, image: &ImageRef) -> Result<Option<ImageId>, AdapterError> {
        Ok(self.local_id(image).map(ImageId::new))
    }

    async fn prune(&self, _dangling_only: bool) -> Result<(), AdapterError> {
        if self.failing(EngineFailure::Prune) {
            return Err(AdapterError::failed(
                "docker image prune",
                1,
                "prune already running",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterFailure {
    SetImage,
    /// Rollout reports failure.
    Unhealthy,
    /// Rollout reports its own timeout.
    RolloutTimedOut,
    /// Rollout status never returns.
    HangRollout,
    /// Set-image changes the spec, then never returns.
    HangAfterSetImage,
    Undo,
}

struct ClusterState {
    generations: Vec<String>,
    undo_calls: usize,
}

/// A deployment with a rollout history; undo drops the newest generation.
pub struct FakeCluster {
    state: Mutex<ClusterState>,
    failures: Mutex<HashSet<ClusterFailure>>,
}

impl FakeCluster {
    pub fn new(initial_image: &str) -> Self {
        Self {
            state: Mutex::new(ClusterState {
                generations: vec![initial_image.to_string()],
                undo_calls: 0,
            }),
            failures: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail(&self, failure: ClusterFailure) {
        self.failures.lock().insert(failure);
    }

    pub fn heal(&self) {
        self.failures.lock().clear();
    }

    fn failing(&self, failure: ClusterFailure) -> bool {
        self.failures.lock().contains(&failure)
    }

    pub fn image(&self) -> Option<String> {
        self.state.lock().generations.last().cloned()
    }

    pub fn generations(&self) -> usize {
        self.state.lock().generations.len()
    }

    pub fn undo_calls(&self) -> usize {
        self.state.lock().undo_calls
    }
}

#[async_trait]
impl OrchestratorOps for FakeCluster {
    async fn current_image(
        &self,
        _target: &DeploymentTarget,
    ) -> Result<Option<String>, AdapterError> {
        Ok(self.image())
    }

    async fn set_image(
        &self,
        _target: &DeploymentTarget,
        image: &ImageRef,
    ) -> Result<(), AdapterError> {
        if self.failing(ClusterFailure::SetImage) {
            return Err(AdapterError::failed(
                "kubectl set image",
                1,
                "admission webhook denied the request",
            ));
        }
        let image = image.to_string();
        {
            let mut state = self.state.lock();
            // Same spec, no new generation.
            if state.generations.last() != Some(&image) {
                state.generations.push(image);
            }
        }
        if self.failing(ClusterFailure::HangAfterSetImage) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn rollout_status(
        &self,
        _target: &DeploymentTarget,
        _timeout: Duration,
    ) -> Result<RolloutStatus, AdapterError> {
        if self.failing(ClusterFailure::HangRollout) {
            std::future::pending::<()>().await;
        }
        if self.failing(ClusterFailure::RolloutTimedOut) {
            return Ok(RolloutStatus::TimedOut);
        }
        if self.failing(ClusterFailure::Unhealthy) {
            return Ok(RolloutStatus::Failed(
                "deployment exceeded its progress deadline".to_string(),
            ));
        }
        Ok(RolloutStatus::Healthy)
    }

    async fn rollout_undo(&self, _target: &DeploymentTarget) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.undo_calls += 1;
        if self.failing(ClusterFailure::Undo) || state.generations.len() < 2 {
            return Err(AdapterError::failed(
                "kubectl rollout undo",
                1,
                "no rollout history found",
            ));
        }
        state.generations.pop();
        Ok(())
    }
}
