// ABOUTME: Init command implementation.
// ABOUTME: Writes a hoku.yml template into the current directory.

use hoku::config::{self, CONFIG_FILENAME};
use hoku::error::Result;
use hoku::output::Output;
use std::path::Path;

pub fn init(
    dir: &Path,
    workload: Option<&str>,
    registry: Option<&str>,
    force: bool,
    output: Output,
) -> Result<i32> {
    config::init_config(dir, workload, registry, force)?;
    output.success(&format!("Created {}", dir.join(CONFIG_FILENAME).display()));
    Ok(0)
}
