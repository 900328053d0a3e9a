//! topocheck - convergence checks for virtual routing topologies
//!
//! This library runs shell probes against named routers through a
//! pluggable executor and verifies, phase by phase, that a routing
//! protocol converges and survives link flaps.

pub mod cli;
pub mod commands;
pub mod common;
pub mod exec;
pub mod testing;
pub mod topology;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use topology::{Interface, Router, Topology};
