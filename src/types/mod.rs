// ABOUTME: Validated domain types shared by the pipeline, adapters and config.
// ABOUTME: Uses phantom types to keep image and commit identifiers apart.

mod id;
mod image_ref;
mod registry;
mod revision;
mod workload_name;

pub use id::{CommitId, ImageId};
pub use image_ref::ImageRef;
pub use registry::{Registry, RegistryError};
pub use revision::{Revision, RevisionError};
pub use workload_name::{WorkloadName, WorkloadNameError};
