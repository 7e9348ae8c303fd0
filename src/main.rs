// ABOUTME: Entry point for the hoku CLI application.
// ABOUTME: Parses arguments, sets up tracing, dispatches to command handlers, maps exit codes.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use hoku::config::Config;
use hoku::error::Result;
use hoku::output::{Output, OutputMode};
use hoku::types::Revision;
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; --verbose raises the default to debug.
    let default_filter = if cli.verbose {
        "hoku=debug,tower_http=debug"
    } else {
        "hoku=info,tower_http=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = OutputMode::from_flags(cli.quiet, cli.json);

    let code = match run(cli, mode).await {
        Ok(code) => code,
        Err(e) => {
            Output::new(mode).error(&e.to_string());
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli, mode: OutputMode) -> Result<i32> {
    let output = Output::new(mode);
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init {
            workload,
            registry,
            force,
        } => commands::init(&cwd, workload.as_deref(), registry.as_deref(), force, output),
        Commands::Deploy { revision, force } => {
            let revision = Revision::parse(&revision)?;
            let (config, project_dir) = load_config(cli.config.as_deref(), &cwd)?;
            commands::deploy(config, &project_dir, revision, force, output).await
        }
        Commands::Rollback { force } => {
            let (config, _) = load_config(cli.config.as_deref(), &cwd)?;
            commands::rollback(config, force, output).await
        }
        Commands::Status => {
            let (config, _) = load_config(cli.config.as_deref(), &cwd)?;
            commands::status(config, output).await
        }
        Commands::Serve => {
            let (config, project_dir) = load_config(cli.config.as_deref(), &cwd)?;
            commands::serve(config, &project_dir, output).await
        }
    }
}

/// Load the config and the directory hooks are looked up in.
fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<(Config, PathBuf)> {
    match explicit {
        Some(path) => {
            let config = Config::load(path)?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.to_path_buf());
            Ok((config, dir))
        }
        None => Ok((Config::discover(cwd)?, cwd.to_path_buf())),
    }
}
