// ABOUTME: Serve command implementation.
// ABOUTME: Runs the trigger gateway until interrupted.

use hoku::adapters::Adapters;
use hoku::config::Config;
use hoku::error::{Error, Result};
use hoku::hooks::HookRunner;
use hoku::output::Output;
use hoku::supervisor::Supervisor;
use hoku::trigger::{Dispatcher, GatewayState};
use std::path::Path;
use std::sync::Arc;

pub async fn serve(config: Config, project_dir: &Path, output: Output) -> Result<i32> {
    let gateway = config.gateway.clone().ok_or(Error::GatewayNotConfigured)?;
    let secret = gateway.secret.resolve()?;
    let state_dir = config.state_dir()?;
    let adapters = Adapters::from_config(&config)?;
    let hooks = HookRunner::new(project_dir, config.timeouts.command);
    let branch = config.source.branch.clone();

    let supervisor = Supervisor::new(Arc::new(config), adapters, state_dir).with_hooks(hooks);
    let dispatcher = Dispatcher::new(Arc::new(supervisor));
    let state = GatewayState::new(dispatcher, secret.as_bytes(), &branch);

    let listener = tokio::net::TcpListener::bind(&gateway.bind)
        .await
        .map_err(|e| Error::Gateway(format!("cannot bind {}: {e}", gateway.bind)))?;
    output.success(&format!(
        "Listening on {} for pushes to {} at {}",
        gateway.bind, branch, gateway.path
    ));

    hoku::trigger::serve(listener, state, &gateway.path)
        .await
        .map_err(|e| Error::Gateway(e.to_string()))?;
    Ok(0)
}
