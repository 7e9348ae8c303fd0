// ABOUTME: Hooks system for the run lifecycle.
// ABOUTME: Discovers and executes scripts at pre-deploy, post-deploy, and on-failure points.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::types::WorkloadName;

/// Hook execution points in the run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before the pipeline starts. Failure rejects the run.
    PreDeploy,
    /// After a `deployed` outcome. Failure logs warning.
    PostDeploy,
    /// After any other outcome. Failure logs warning.
    OnFailure,
}

impl HookPoint {
    pub fn filename(&self) -> &'static str {
        match self {
            HookPoint::PreDeploy => "pre-deploy",
            HookPoint::PostDeploy => "post-deploy",
            HookPoint::OnFailure => "on-failure",
        }
    }
}

/// Context passed to hooks via environment variables.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub workload: WorkloadName,
    pub namespace: String,
    pub revision: String,
    pub image: String,
    /// Set once the run has finished.
    pub outcome: Option<String>,
    pub previous_image: Option<String>,
}

impl HookContext {
    pub fn to_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("HOKU_WORKLOAD".to_string(), self.workload.to_string());
        env.insert("HOKU_NAMESPACE".to_string(), self.namespace.clone());
        env.insert("HOKU_REVISION".to_string(), self.revision.clone());
        env.insert("HOKU_IMAGE".to_string(), self.image.clone());
        if let Some(ref outcome) = self.outcome {
            env.insert("HOKU_OUTCOME".to_string(), outcome.clone());
        }
        if let Some(ref prev) = self.previous_image {
            env.insert("HOKU_PREVIOUS_IMAGE".to_string(), prev.clone());
        }
        env
    }
}

/// Result of running a hook.
#[derive(Debug)]
pub struct HookResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl HookResult {
    fn failed(stderr: String) -> Self {
        Self {
            success: false,
            exit_code: None,
            stdout: String::new(),
            stderr,
        }
    }
}

/// Discovers and runs hooks from a project directory.
#[derive(Debug, Clone)]
pub struct HookRunner {
    hooks_dir: PathBuf,
    timeout: Duration,
}

impl HookRunner {
    /// Look for hooks in `<project_dir>/.hoku/hooks`.
    pub fn new(project_dir: &Path, timeout: Duration) -> Self {
        Self {
            hooks_dir: project_dir.join(".hoku").join("hooks"),
            timeout,
        }
    }

    pub fn hook_exists(&self, point: HookPoint) -> bool {
        self.hook_path(point).is_file()
    }

    fn hook_path(&self, point: HookPoint) -> PathBuf {
        self.hooks_dir.join(point.filename())
    }

    /// Run a hook if it exists.
    ///
    /// Returns None if the hook doesn't exist, or Some(HookResult) if it was run.
    pub async fn run(&self, point: HookPoint, context: &HookContext) -> Option<HookResult> {
        let hook_path = self.hook_path(point);

        if !hook_path.is_file() {
            return None;
        }

        tracing::info!(hook = point.filename(), path = %hook_path.display(), "running hook");

        let output = Command::new(&hook_path)
            .envs(context.to_env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let result = match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(output)) => HookResult {
                success: output.status.success(),
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Ok(Err(e)) => {
                tracing::error!(hook = point.filename(), error = %e, "failed to execute hook");
                HookResult::failed(e.to_string())
            }
            Err(_) => {
                tracing::error!(hook = point.filename(), timeout_secs = self.timeout.as_secs(), "hook timed out");
                HookResult::failed(format!("timed out after {}s", self.timeout.as_secs()))
            }
        };

        if result.success {
            tracing::info!(hook = point.filename(), "hook completed successfully");
        } else {
            tracing::warn!(hook = point.filename(), exit_code = ?result.exit_code, "hook failed");
        }

        Some(result)
    }
}
