// ABOUTME: Image operations via the docker or podman CLI.
// ABOUTME: Builds run under a CPU share and memory ceiling; missing images map to None/false.

use async_trait::async_trait;
use std::time::Duration;

use super::command::{Cmd, DEFAULT_TIMEOUT};
use super::error::AdapterError;
use super::traits::{BuildRequest, ImageOps};
use super::types::RuntimeType;
use crate::types::{ImageId, ImageRef};

/// Drives a container engine CLI on the local host.
#[derive(Debug, Clone)]
pub struct CliImageEngine {
    runtime: RuntimeType,
    command_timeout: Duration,
    build_timeout: Duration,
    push_timeout: Duration,
    insecure_registry: bool,
}

impl CliImageEngine {
    pub fn new(runtime: RuntimeType) -> Self {
        Self {
            runtime,
            command_timeout: DEFAULT_TIMEOUT,
            build_timeout: DEFAULT_TIMEOUT,
            push_timeout: DEFAULT_TIMEOUT,
            insecure_registry: false,
        }
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn build_timeout(mut self, timeout: Duration) -> Self {
        self.build_timeout = timeout;
        self
    }

    pub fn push_timeout(mut self, timeout: Duration) -> Self {
        self.push_timeout = timeout;
        self
    }

    /// Talk plain HTTP to the registry (podman only; docker reads daemon config).
    pub fn insecure_registry(mut self, insecure: bool) -> Self {
        self.insecure_registry = insecure;
        self
    }

    pub fn runtime(&self) -> RuntimeType {
        self.runtime
    }

    fn cli(&self) -> Cmd {
        Cmd::new(self.runtime.binary()).timeout(self.command_timeout)
    }

    fn registry_flags(&self) -> Vec<&'static str> {
        if self.insecure_registry && self.runtime == RuntimeType::Podman {
            vec!["--tls-verify=false"]
        } else {
            Vec::new()
        }
    }

    /// Arguments for `build`, without the binary.
    pub fn build_args(request: &BuildRequest) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "--tag".to_string(),
            request.tag.to_string(),
            "--cpu-shares".to_string(),
            request.limits.cpu_shares.to_string(),
            "--memory".to_string(),
            request.limits.memory_bytes.to_string(),
        ];
        if let Some(ref dockerfile) = request.dockerfile {
            args.push("--file".to_string());
            args.push(request.context.join(dockerfile).display().to_string());
        }
        args.push(request.context.display().to_string());
        args
    }
}

#[async_trait]
impl ImageOps for CliImageEngine {
    async fn build(&self, request: &BuildRequest) -> Result<(), AdapterError> {
        self.cli()
            .args(Self::build_args(request))
            .timeout(self.build_timeout)
            .run()
            .await?;
        Ok(())
    }

    async fn tag(&self, source: &ImageRef, target: &ImageRef) -> Result<(), AdapterError> {
        self.cli()
            .args(["tag".to_string(), source.to_string(), target.to_string()])
            .run()
            .await?;
        Ok(())
    }

    async fn untag(&self, image: &ImageRef) -> Result<(), AdapterError> {
        let cmd = self.cli().args(["image", "rm"]).arg(image.to_string());
        let output = cmd.output().await?;
        if output.success() || is_missing_image(&output.stderr) {
            return Ok(());
        }
        Err(AdapterError::NonZeroExit {
            command: cmd.display(),
            code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        })
    }

    async fn push(&self, image: &ImageRef) -> Result<(), AdapterError> {
        self.cli()
            .arg("push")
            .args(self.registry_flags())
            .arg(image.to_string())
            .timeout(self.push_timeout)
            .run()
            .await?;
        Ok(())
    }

    async fn pull(&self, image: &ImageRef) -> Result<bool, AdapterError> {
        let cmd = self
            .cli()
            .args(["pull", "--quiet"])
            .args(self.registry_flags())
            .arg(image.to_string())
            .timeout(self.push_timeout);
        let output = cmd.output().await?;
        if output.success() {
            return Ok(true);
        }
        if is_missing_remote(&output.stderr) {
            return Ok(false);
        }
        Err(AdapterError::NonZeroExit {
            command: cmd.display(),
            code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        })
    }

    async fn inspect(&self, image: &ImageRef) -> Result<Option<ImageId>, AdapterError> {
        let cmd = self
            .cli()
            .args(["image", "inspect", "--format", "{{.Id}}"])
            .arg(image.to_string());
        let output = cmd.output().await?;
        if !output.success() {
            if is_missing_image(&output.stderr) {
                return Ok(None);
            }
            return Err(AdapterError::NonZeroExit {
                command: cmd.display(),
                code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        let id = output.stdout.trim();
        if id.is_empty() {
            return Err(AdapterError::UnexpectedOutput {
                command: cmd.display(),
                detail: "empty image id".to_string(),
            });
        }
        Ok(Some(ImageId::new(id)))
    }

    async fn prune(&self, dangling_only: bool) -> Result<(), AdapterError> {
        let mut cmd = self.cli().args(["image", "prune", "--force"]);
        if !dangling_only {
            cmd = cmd.arg("--all");
        }
        cmd.run().await?;
        Ok(())
    }
}

/// Whether engine stderr says a local image does not exist.
fn is_missing_image(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    ["no such image", "no such object", "image not known", "failed to find image"]
        .iter()
        .any(|needle| stderr.contains(needle))
}

/// Whether engine stderr says the registry does not have a tag.
fn is_missing_remote(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    ["manifest unknown", "name unknown", "not found", "does not exist"]
        .iter()
        .any(|needle| stderr.contains(needle))
}
