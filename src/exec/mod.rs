//! Command execution boundary
//!
//! The test engine only needs two things from the outside world: run an
//! argument vector on a named host and capture its output, and dump the
//! forwarding table of the control process for diagnostics. How a
//! hostname turns into a container, VM or SSH session is the business of
//! the implementation behind these traits.

mod process;

pub use process::{LocalDump, ProcessExecutor};

use async_trait::async_trait;

use crate::common::Result;

/// Runs commands against named hosts
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `args` on `host` and return its captured output
    ///
    /// A command that cannot be started, or that exits unsuccessfully, is
    /// an `Error::Execution`.
    async fn execute(&self, host: &str, args: &[String]) -> Result<String>;
}

/// Produces a forwarding-state dump on the control host
#[async_trait]
pub trait DiagnosticDump: Send + Sync {
    async fn dump_forwarding_state(&self) -> Result<String>;
}

/// Dump implementation used when diagnostics are disabled
pub struct NoDump;

#[async_trait]
impl DiagnosticDump for NoDump {
    async fn dump_forwarding_state(&self) -> Result<String> {
        Ok(String::new())
    }
}
