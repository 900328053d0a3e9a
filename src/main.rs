//! topocheck - convergence checks for virtual routing topologies
//!
//! Runs ordered test phases against a set of named routers and waits,
//! within explicit budgets, for the routing protocol to converge.

use std::path::PathBuf;

use clap::Parser;
use topocheck::cli::{self, GlobalOpts};
use topocheck::commands::Commands;
use topocheck::common::logging;

#[derive(Parser)]
#[command(name = "topocheck", about = "Routing topology convergence checks")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Show every check and debug logs
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(path) = logging::init_cli(cli.verbose, cli.log_file.as_deref()) {
        tracing::debug!(path = %path.display(), "Logging to file");
    }

    let opts = GlobalOpts {
        config: cli.config,
        verbose: cli.verbose,
    };

    match cli::dispatch(cli.command, &opts).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}
