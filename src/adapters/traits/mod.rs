// ABOUTME: Capability traits for the pipeline's external collaborators.
// ABOUTME: Defines SourceOps, ImageOps and OrchestratorOps plus their shared request types.

mod image;
mod orchestrator;
mod shared_types;
mod source;

pub use image::ImageOps;
pub use orchestrator::OrchestratorOps;
pub use shared_types::*;
pub use source::SourceOps;
