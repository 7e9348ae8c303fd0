// ABOUTME: Source control operations trait.
// ABOUTME: Brings a working copy to an exact revision of the deployment branch.

use super::shared_types::Checkout;
use crate::adapters::AdapterError;
use crate::types::{CommitId, Revision};
use async_trait::async_trait;

/// Source synchronisation.
#[async_trait]
pub trait SourceOps: Send + Sync {
    /// Fetch the branch and check out `revision`, returning the full commit
    /// hash HEAD resolved to. Must fail if the path is not a working copy.
    async fn sync(&self, checkout: &Checkout, revision: &Revision)
    -> Result<CommitId, AdapterError>;
}
