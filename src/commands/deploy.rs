// ABOUTME: Deploy command implementation.
// ABOUTME: Runs one revision through the supervisor and prints the run report.

use hoku::adapters::Adapters;
use hoku::config::Config;
use hoku::error::Result;
use hoku::hooks::HookRunner;
use hoku::output::{Output, OutputMode};
use hoku::pipeline::RunReport;
use hoku::supervisor::Supervisor;
use hoku::types::Revision;
use std::path::Path;
use std::sync::Arc;

pub async fn deploy(
    config: Config,
    project_dir: &Path,
    revision: Revision,
    force: bool,
    mut output: Output,
) -> Result<i32> {
    output.start_timer();
    let state_dir = config.state_dir()?;
    let adapters = Adapters::from_config(&config)?;
    let hooks = HookRunner::new(project_dir, config.timeouts.command);

    output.progress(&format!(
        "Deploying {} revision {} to {}",
        config.workload,
        revision.short(),
        config.target()
    ));

    let supervisor = Supervisor::new(Arc::new(config), adapters, state_dir).with_hooks(hooks);
    let report = supervisor.deploy(&revision, force).await;

    print_report(&report, &output);
    Ok(report.exit_code())
}

fn print_report(report: &RunReport, output: &Output) {
    if output.mode() == OutputMode::Json {
        output.value(report);
        return;
    }

    for step in &report.steps {
        let mark = if step.success { "✓" } else { "✗" };
        output.progress(&format!("  {mark} {}: {}", step.stage, step.message));
    }
    for warning in &report.warnings {
        output.warning(&warning.message);
    }

    if report.outcome.is_success() {
        output.success(&report.summary());
    } else {
        output.error(&report.summary());
    }
}
