//! Convergence test engine
//!
//! Reads YAML test suites, expands them into ordered phases of checks
//! against a topology, and polls the routers until each expected fact
//! holds or its attempt budget runs out.

pub mod assertion;
mod checks;
mod config;
pub mod phase;
pub mod poller;
mod runner;
pub mod sequencer;

#[cfg(test)]
pub(crate) mod mock;

pub use checks::{Check, Harness};
pub use config::*;
pub use phase::{FailureMode, PhaseKind, PhaseReport, PhaseStatus, RunReport, RunState};
pub use poller::{poll, poll_until, PollOutcome, PollPolicy};
pub use runner::{print_summary, run_suite, run_variant, RunOptions};
