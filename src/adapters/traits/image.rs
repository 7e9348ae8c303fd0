// ABOUTME: Image engine operations trait.
// ABOUTME: Build, tag, untag, push, pull, inspect and prune container images.

use super::shared_types::BuildRequest;
use crate::adapters::AdapterError;
use crate::types::{ImageId, ImageRef};
use async_trait::async_trait;

/// Image operations against the local engine and its registry.
#[async_trait]
pub trait ImageOps: Send + Sync {
    /// Build an image from a context directory under resource limits.
    async fn build(&self, request: &BuildRequest) -> Result<(), AdapterError>;

    /// Point `target` at the same image as `source` (re-tag, not copy).
    async fn tag(&self, source: &ImageRef, target: &ImageRef) -> Result<(), AdapterError>;

    /// Remove a local tag. The image stays while other tags name it; a
    /// missing tag is not an error.
    async fn untag(&self, image: &ImageRef) -> Result<(), AdapterError>;

    /// Push a tag to its registry.
    async fn push(&self, image: &ImageRef) -> Result<(), AdapterError>;

    /// Pull a tag from its registry. Returns `false` if the registry does not
    /// have it.
    async fn pull(&self, image: &ImageRef) -> Result<bool, AdapterError>;

    /// Content-addressed ID of a local tag, or `None` if it does not exist.
    async fn inspect(&self, image: &ImageRef) -> Result<Option<ImageId>, AdapterError>;

    /// Remove unused images; with `dangling_only` only untagged ones.
    async fn prune(&self, dangling_only: bool) -> Result<(), AdapterError>;
}
