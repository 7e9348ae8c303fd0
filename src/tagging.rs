// ABOUTME: Image tagging protocol: revision, latest and stable tags for one workload.
// ABOUTME: Keeps "desired", "current" and "last known good" independently addressable.

use crate::adapters::{AdapterError, ImageOps};
use crate::types::{ImageId, ImageRef, Registry, Revision, WorkloadName};

/// Floating tag naming the image the workload should run.
pub const LATEST_TAG: &str = "latest";

/// Floating tag naming the last image confirmed healthy.
pub const STABLE_TAG: &str = "stable";

/// The two floating pointers of a workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatingTags {
    pub latest: ImageRef,
    pub stable: ImageRef,
}

impl FloatingTags {
    pub fn new(registry: &Registry, workload: &WorkloadName) -> Self {
        Self {
            latest: ImageRef::new(registry, workload, LATEST_TAG),
            stable: ImageRef::new(registry, workload, STABLE_TAG),
        }
    }
}

/// All three image references of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSet {
    /// Immutable tag for this revision.
    pub commit: ImageRef,
    pub latest: ImageRef,
    pub stable: ImageRef,
}

impl ImageSet {
    /// Pure string composition; touches nothing.
    pub fn new(registry: &Registry, workload: &WorkloadName, revision: &Revision) -> Self {
        let FloatingTags { latest, stable } = FloatingTags::new(registry, workload);
        Self {
            commit: ImageRef::new(registry, workload, revision.short()),
            latest,
            stable,
        }
    }

    pub fn floating(&self) -> FloatingTags {
        FloatingTags {
            latest: self.latest.clone(),
            stable: self.stable.clone(),
        }
    }
}

/// Errors from tag maintenance.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    /// Nothing to roll back to (failure on the very first deployment).
    #[error("no stable image exists for {0}")]
    NoStableImage(String),

    #[error(transparent)]
    Engine(#[from] AdapterError),
}

/// What `backup_current_as_stable` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// No `latest` anywhere: first deployment.
    NoPriorImage,
    /// `latest` already is the incoming image; `stable` left alone.
    AlreadyCurrent(ImageId),
    /// `stable` now points at the image `latest` pointed at.
    BackedUp(ImageId),
}

/// Maintains the floating tags through an image engine.
pub struct TagProtocol<'a, I: ImageOps + ?Sized> {
    images: &'a I,
    tags: FloatingTags,
}

impl<'a, I: ImageOps + ?Sized> TagProtocol<'a, I> {
    pub fn new(images: &'a I, tags: FloatingTags) -> Self {
        Self { images, tags }
    }

    pub fn tags(&self) -> &FloatingTags {
        &self.tags
    }

    /// Resolve a tag locally, falling back to the registry.
    pub async fn locate(&self, image: &ImageRef) -> Result<Option<ImageId>, AdapterError> {
        if let Some(id) = self.images.inspect(image).await? {
            return Ok(Some(id));
        }
        if self.images.pull(image).await? {
            return self.images.inspect(image).await;
        }
        Ok(None)
    }

    /// Point `stable` at whatever `latest` points at.
    ///
    /// `incoming` is the revision tag about to be deployed; when `latest`
    /// already resolves to that same image the run is a re-run and `stable`
    /// keeps its current target.
    pub async fn backup_current_as_stable(
        &self,
        incoming: Option<&ImageRef>,
    ) -> Result<BackupOutcome, AdapterError> {
        let Some(current) = self.locate(&self.tags.latest).await? else {
            tracing::info!(latest = %self.tags.latest, "no latest image yet, nothing to back up");
            return Ok(BackupOutcome::NoPriorImage);
        };

        if let Some(incoming) = incoming
            && self.images.inspect(incoming).await?.as_ref() == Some(&current)
        {
            tracing::info!(image = %current, "latest already is the incoming revision, keeping stable");
            return Ok(BackupOutcome::AlreadyCurrent(current));
        }

        self.images.tag(&self.tags.latest, &self.tags.stable).await?;
        tracing::info!(stable = %self.tags.stable, image = %current, "backed up latest as stable");
        Ok(BackupOutcome::BackedUp(current))
    }

    /// Re-tag a freshly built image as `latest`.
    pub async fn promote_to_latest(&self, commit: &ImageRef) -> Result<(), AdapterError> {
        self.images.tag(commit, &self.tags.latest).await
    }

    /// Push `commit` and any local `stable`, then promote `commit` to
    /// `latest` and push that last.
    ///
    /// A failed push of `latest` puts the local `latest` back where it was,
    /// so the next run never backs up an image that was never deployed.
    pub async fn publish(&self, commit: &ImageRef) -> Result<(), AdapterError> {
        self.images.push(commit).await?;
        if self.images.inspect(&self.tags.stable).await?.is_some() {
            self.images.push(&self.tags.stable).await?;
        }

        let previous = self.images.inspect(&self.tags.latest).await?;
        self.promote_to_latest(commit).await?;
        if let Err(err) = self.images.push(&self.tags.latest).await {
            if let Err(reset) = self.reset_local_latest(previous.as_ref()).await {
                tracing::warn!(latest = %self.tags.latest, error = %reset, "could not reset local latest");
            }
            return Err(err);
        }
        Ok(())
    }

    /// Point the local `latest` back at `previous`: through `stable` when it
    /// names the same image, else from the registry, else drop the tag.
    async fn reset_local_latest(&self, previous: Option<&ImageId>) -> Result<(), AdapterError> {
        let Some(previous) = previous else {
            tracing::info!(latest = %self.tags.latest, "no latest before promotion, untagging");
            return self.images.untag(&self.tags.latest).await;
        };

        if self.images.inspect(&self.tags.stable).await?.as_ref() == Some(previous) {
            self.images.tag(&self.tags.stable, &self.tags.latest).await?;
        } else if !self.images.pull(&self.tags.latest).await? {
            self.images.untag(&self.tags.latest).await?;
        }
        tracing::info!(latest = %self.tags.latest, image = %previous, "local latest reset after failed push");
        Ok(())
    }

    /// Point `latest` back at `stable` and republish it.
    pub async fn restore_stable_to_latest(&self) -> Result<ImageId, TagError> {
        let stable = self
            .locate(&self.tags.stable)
            .await?
            .ok_or_else(|| TagError::NoStableImage(self.tags.stable.to_string()))?;

        self.images.tag(&self.tags.stable, &self.tags.latest).await?;
        self.images.push(&self.tags.latest).await?;
        tracing::info!(latest = %self.tags.latest, image = %stable, "restored stable to latest");
        Ok(stable)
    }
}
