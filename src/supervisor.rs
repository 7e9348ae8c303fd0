// ABOUTME: Wraps a pipeline run with the run lock and lifecycle hooks.
// ABOUTME: The single entry point used by both the CLI and the trigger gateway.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::Adapters;
use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::Result;
use crate::hooks::{HookContext, HookPoint, HookRunner};
use crate::pipeline::{Failure, Pipeline, RunLock, RunReport, Stage, manual_rollback};
use crate::tagging::ImageSet;
use crate::trigger::Deployer;
use crate::types::{ImageId, Revision};

/// Slack on top of the configured bounds before a lock counts as abandoned.
const LEASE_MARGIN: Duration = Duration::from_secs(10 * 60);

/// Serializes runs of one workload and runs its hooks around them.
#[derive(Clone)]
pub struct Supervisor {
    config: Arc<Config>,
    adapters: Adapters,
    state_dir: PathBuf,
    hooks: Option<HookRunner>,
}

impl Supervisor {
    pub fn new(config: Arc<Config>, adapters: Adapters, state_dir: PathBuf) -> Self {
        Self {
            config,
            adapters,
            state_dir,
            hooks: None,
        }
    }

    pub fn with_hooks(mut self, hooks: HookRunner) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lock, run the pre-deploy hook, run the pipeline, run the closing
    /// hook, unlock. Refusals come back as reports with an input failure.
    pub async fn deploy(&self, revision: &Revision, force: bool) -> RunReport {
        let config = self.config.as_ref();
        let images = ImageSet::new(&config.registry, &config.workload, revision);
        let image = images.commit.to_string();
        let reject = |message: String| {
            tracing::error!(revision = revision.as_str(), "{message}");
            RunReport::rejected(
                config.workload.as_str(),
                revision.as_str(),
                &image,
                Failure::input(message),
            )
        };

        let lease = self.deploy_lease();
        let lock = match RunLock::acquire(&self.state_dir, &config.workload, lease, force) {
            Ok(lock) => lock,
            Err(e) => return reject(e.to_string()),
        };

        let mut context = HookContext {
            workload: config.workload.clone(),
            namespace: config.namespace.clone(),
            revision: revision.as_str().to_string(),
            image: image.clone(),
            outcome: None,
            previous_image: None,
        };

        if let Some(result) = self.run_hook(HookPoint::PreDeploy, &context).await
            && !result.success
        {
            return reject(format!(
                "pre-deploy hook failed (exit {:?}): {}",
                result.exit_code,
                result.stderr.trim()
            ));
        }

        let mut report = Pipeline::new(config, &self.adapters).run(revision).await;
        let mut diagnostics = Diagnostics::default();

        context.outcome = Some(report.outcome.to_string());
        context.previous_image = report.previous_image.clone();
        let point = if report.outcome.is_success() {
            HookPoint::PostDeploy
        } else {
            HookPoint::OnFailure
        };
        if let Some(result) = self.run_hook(point, &context).await
            && !result.success
        {
            diagnostics.warn(Warning::hook(format!(
                "{} hook failed (exit {:?}): {}",
                point.filename(),
                result.exit_code,
                result.stderr.trim()
            )));
        }

        if let Err(e) = lock.release() {
            diagnostics.warn(Warning::lock_release(e.to_string()));
        }

        report.warnings.extend(diagnostics.into_warnings());
        report
    }

    /// Operator rollback under the same lock as deployments.
    pub async fn rollback(&self, force: bool) -> Result<ImageId> {
        let lease = self.config.timeouts.rollback + LEASE_MARGIN;
        let lock = RunLock::acquire(&self.state_dir, &self.config.workload, lease, force)?;
        let restored = manual_rollback(&self.config, &self.adapters).await;
        if let Err(e) = lock.release() {
            tracing::warn!(error = %e, "failed to release run lock");
        }
        Ok(restored?)
    }

    /// Longest a deployment can hold the lock: the worst-case pipeline plus
    /// the pre-deploy and closing hooks.
    pub fn deploy_lease(&self) -> Duration {
        let timeouts = &self.config.timeouts;
        Stage::worst_case(timeouts) + timeouts.command * 2 + LEASE_MARGIN
    }

    async fn run_hook(
        &self,
        point: HookPoint,
        context: &HookContext,
    ) -> Option<crate::hooks::HookResult> {
        match self.hooks {
            Some(ref hooks) => hooks.run(point, context).await,
            None => None,
        }
    }
}

#[async_trait]
impl Deployer for Supervisor {
    async fn deploy(&self, revision: Revision) -> RunReport {
        Supervisor::deploy(self, &revision, false).await
    }
}
