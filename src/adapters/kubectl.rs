// ABOUTME: Orchestrator operations via the kubectl CLI.
// ABOUTME: Rollout status is the health signal; undo uses the deployment's own revision history.

use async_trait::async_trait;
use std::time::Duration;

use super::command::{Cmd, DEFAULT_TIMEOUT};
use super::error::AdapterError;
use super::traits::{DeploymentTarget, OrchestratorOps, RolloutStatus};
use crate::types::ImageRef;

/// Extra time the kubectl process gets beyond its own `--timeout`.
const STATUS_GRACE: Duration = Duration::from_secs(30);

/// Drives `kubectl` against the cluster of the current (or configured) context.
#[derive(Debug, Clone)]
pub struct Kubectl {
    binary: String,
    context: Option<String>,
    timeout: Duration,
}

impl Default for Kubectl {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

impl Kubectl {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            context: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn kubectl(&self, target: &DeploymentTarget) -> Cmd {
        let mut cmd = Cmd::new(&self.binary).timeout(self.timeout);
        if let Some(ref context) = self.context {
            cmd = cmd.arg("--context").arg(context);
        }
        cmd.arg("--namespace").arg(&target.namespace)
    }

    fn resource(target: &DeploymentTarget) -> String {
        format!("deployment/{}", target.name)
    }
}

#[async_trait]
impl OrchestratorOps for Kubectl {
    async fn current_image(
        &self,
        target: &DeploymentTarget,
    ) -> Result<Option<String>, AdapterError> {
        let jsonpath = format!(
            "jsonpath={{.spec.template.spec.containers[?(@.name==\"{}\")].image}}",
            target.container
        );
        let output = self
            .kubectl(target)
            .args(["get", &Self::resource(target), "--output", &jsonpath])
            .run()
            .await?;
        let image = output.stdout.trim();
        Ok((!image.is_empty()).then(|| image.to_string()))
    }

    async fn set_image(
        &self,
        target: &DeploymentTarget,
        image: &ImageRef,
    ) -> Result<(), AdapterError> {
        self.kubectl(target)
            .args([
                "set".to_string(),
                "image".to_string(),
                Self::resource(target),
                format!("{}={}", target.container, image),
            ])
            .run()
            .await?;
        Ok(())
    }

    async fn rollout_status(
        &self,
        target: &DeploymentTarget,
        timeout: Duration,
    ) -> Result<RolloutStatus, AdapterError> {
        let cmd = self
            .kubectl(target)
            .args([
                "rollout".to_string(),
                "status".to_string(),
                Self::resource(target),
                format!("--timeout={}s", timeout.as_secs()),
            ])
            .timeout(timeout + STATUS_GRACE);

        match cmd.output().await {
            Ok(output) if output.success() => Ok(RolloutStatus::Healthy),
            Ok(output) => Ok(classify_rollout_failure(&output.stderr)),
            Err(AdapterError::TimedOut { .. }) => Ok(RolloutStatus::TimedOut),
            Err(e) => Err(e),
        }
    }

    async fn rollout_undo(&self, target: &DeploymentTarget) -> Result<(), AdapterError> {
        self.kubectl(target)
            .args(["rollout", "undo", &Self::resource(target)])
            .run()
            .await?;
        Ok(())
    }
}

/// Map a failed `kubectl rollout status` to a status.
fn classify_rollout_failure(stderr: &str) -> RolloutStatus {
    let stderr = stderr.trim();
    if stderr.to_lowercase().contains("timed out waiting") {
        RolloutStatus::TimedOut
    } else {
        RolloutStatus::Failed(stderr.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_timeout_is_timed_out() {
        assert_eq!(
            classify_rollout_failure("error: timed out waiting for the condition\n"),
            RolloutStatus::TimedOut
        );
    }

    #[test]
    fn progress_deadline_is_failure() {
        let status = classify_rollout_failure(
            "error: deployment \"app\" exceeded its progress deadline",
        );
        assert!(matches!(status, RolloutStatus::Failed(msg) if msg.contains("progress deadline")));
    }
}
