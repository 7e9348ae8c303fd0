// ABOUTME: Container runtime detection on the local host.
// ABOUTME: Checks for Podman sockets first, then Docker, unless the runtime is configured.

use super::types::{RuntimeInfo, RuntimeType};
use std::path::Path;

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked Podman and Docker sockets)")]
    NoRuntimeFound,
}

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Detect the container runtime on this host.
///
/// An explicit runtime always wins. Otherwise, in order:
/// 1. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 2. Rootful Podman socket (`/run/podman/podman.sock`)
/// 3. Docker socket (`/var/run/docker.sock`)
pub fn detect_runtime(explicit: Option<RuntimeType>) -> Result<RuntimeInfo, DetectionError> {
    if let Some(runtime_type) = explicit {
        return Ok(RuntimeInfo {
            runtime_type,
            socket_path: None,
        });
    }

    let rootless = get_uid().map(|uid| format!("/run/user/{}/podman/podman.sock", uid));
    let candidates = rootless
        .into_iter()
        .map(|path| (RuntimeType::Podman, path))
        .chain([
            (RuntimeType::Podman, ROOTFUL_PODMAN.to_string()),
            (RuntimeType::Docker, DOCKER_SOCKET.to_string()),
        ]);

    for (runtime_type, path) in candidates {
        if Path::new(&path).exists() {
            tracing::debug!(runtime = %runtime_type, socket = %path, "detected container runtime");
            return Ok(RuntimeInfo {
                runtime_type,
                socket_path: Some(path),
            });
        }
    }

    Err(DetectionError::NoRuntimeFound)
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}
