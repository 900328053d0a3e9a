//! CLI command definitions
//!
//! Defines the clap commands for topocheck.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a test suite against its topology variants
    Run {
        /// Path to the YAML suite file
        suite: PathBuf,

        /// Only run this variant (can be given multiple times)
        #[arg(long = "variant")]
        variants: Vec<String>,

        /// Keep checking after a failed check and report every failure in the phase
        #[arg(long)]
        collect_all: bool,

        /// Print reports as JSON instead of human-readable progress
        #[arg(long)]
        json: bool,
    },

    /// Load a suite, resolve its topologies and print the checks it would run
    Validate {
        /// Path to the YAML suite file
        suite: PathBuf,
    },

    /// List the phases in execution order
    Phases,
}
