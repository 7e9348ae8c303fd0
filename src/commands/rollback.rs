// ABOUTME: Rollback command implementation.
// ABOUTME: Undoes the last rollout and points latest back at stable.

use hoku::adapters::Adapters;
use hoku::config::Config;
use hoku::error::Result;
use hoku::output::Output;
use hoku::supervisor::Supervisor;
use std::sync::Arc;

pub async fn rollback(config: Config, force: bool, mut output: Output) -> Result<i32> {
    output.start_timer();
    let state_dir = config.state_dir()?;
    let adapters = Adapters::from_config(&config)?;

    output.progress(&format!("Rolling back {}", config.target()));

    let supervisor = Supervisor::new(Arc::new(config), adapters, state_dir);
    let restored = supervisor.rollback(force).await?;

    output.success(&format!("Rollback complete, latest is {restored}"));
    Ok(0)
}
