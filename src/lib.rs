// ABOUTME: Library root for hoku - exposes the pipeline and its collaborators.
// ABOUTME: The main binary is in main.rs.

pub mod adapters;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod hooks;
pub mod output;
pub mod pipeline;
pub mod supervisor;
pub mod tagging;
pub mod trigger;
pub mod types;
