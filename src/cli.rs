// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands, their arguments, and the global output flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hoku")]
#[command(about = "Push-triggered container build and rollout with automatic rollback")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: hoku.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a hoku.yml template in the current directory
    Init {
        /// Workload (deployment) name
        #[arg(long)]
        workload: Option<String>,

        /// Registry host, e.g. localhost:5000
        #[arg(long)]
        registry: Option<String>,

        /// Overwrite an existing hoku.yml
        #[arg(short, long)]
        force: bool,
    },

    /// Build, publish and roll out a revision
    Deploy {
        /// Commit id to deploy (7 to 64 hex characters)
        revision: String,

        /// Break an existing run lock
        #[arg(long)]
        force: bool,
    },

    /// Undo the last rollout and restore latest from stable
    Rollback {
        /// Break an existing run lock
        #[arg(long)]
        force: bool,
    },

    /// Show the workload's image, tags and lock
    Status,

    /// Accept push notifications and deploy them
    Serve,
}
