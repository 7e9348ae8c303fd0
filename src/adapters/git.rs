// ABOUTME: Git-backed source synchronisation.
// ABOUTME: Fetches the deployment branch and checks out the exact requested revision.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use super::command::{Cmd, DEFAULT_TIMEOUT};
use super::error::AdapterError;
use super::traits::{Checkout, SourceOps};
use crate::types::{CommitId, Revision};

/// Drives the `git` CLI against a local working copy.
#[derive(Debug, Clone)]
pub struct GitSource {
    binary: String,
    timeout: Duration,
}

impl Default for GitSource {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl GitSource {
    pub fn new(timeout: Duration) -> Self {
        Self {
            binary: "git".to_string(),
            timeout,
        }
    }

    fn git(&self, path: &Path) -> Cmd {
        Cmd::new(&self.binary)
            .arg("-C")
            .arg(path.display().to_string())
            .timeout(self.timeout)
    }

    async fn ensure_working_copy(&self, path: &Path) -> Result<(), AdapterError> {
        let output = self
            .git(path)
            .args(["rev-parse", "--is-inside-work-tree"])
            .output()
            .await?;
        if output.success() && output.stdout.trim() == "true" {
            Ok(())
        } else {
            Err(AdapterError::NotWorkingCopy {
                path: path.to_path_buf(),
            })
        }
    }
}

#[async_trait]
impl SourceOps for GitSource {
    async fn sync(
        &self,
        checkout: &Checkout,
        revision: &Revision,
    ) -> Result<CommitId, AdapterError> {
        let path = checkout.path.as_path();
        self.ensure_working_copy(path).await?;

        self.git(path)
            .args(["fetch", "--prune", &checkout.remote, &checkout.branch])
            .run()
            .await?;

        // Refuse revisions that are not part of the deployment branch.
        let upstream = format!("{}/{}", checkout.remote, checkout.branch);
        self.git(path)
            .args(["merge-base", "--is-ancestor", revision.as_str(), &upstream])
            .run()
            .await?;

        self.git(path)
            .args(["checkout", "--force", "-B", &checkout.branch, revision.as_str()])
            .run()
            .await?;

        let head = self.git(path).args(["rev-parse", "HEAD"]).run().await?;
        let resolved = head.stdout.trim().to_string();
        if !revision.matches(&resolved) {
            return Err(AdapterError::RevisionMismatch {
                expected: revision.to_string(),
                resolved,
            });
        }

        Ok(CommitId::new(resolved))
    }
}
