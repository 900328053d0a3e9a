//! Phases and run reports

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// The fixed, ordered set of phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseKind {
    /// Direct neighbors answer pings before routing is involved
    Connectivity,
    /// The routing daemon process runs on every router
    Daemon,
    /// Protocol sessions reach Established
    Neighbors,
    /// Learned prefixes show up in the routing table
    Routes,
    /// Remote networks answer pings once routes converged
    InterConnectivity,
    /// Every interface survives a down/up cycle
    Flap,
}

impl PhaseKind {
    /// Execution order
    pub const ALL: [PhaseKind; 6] = [
        PhaseKind::Connectivity,
        PhaseKind::Daemon,
        PhaseKind::Neighbors,
        PhaseKind::Routes,
        PhaseKind::InterConnectivity,
        PhaseKind::Flap,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PhaseKind::Connectivity => "connectivity",
            PhaseKind::Daemon => "daemon",
            PhaseKind::Neighbors => "neighbors",
            PhaseKind::Routes => "routes",
            PhaseKind::InterConnectivity => "inter-connectivity",
            PhaseKind::Flap => "flap",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PhaseKind::Connectivity => "ping directly connected addresses",
            PhaseKind::Daemon => "routing daemon process is running",
            PhaseKind::Neighbors => "protocol sessions established",
            PhaseKind::Routes => "learned routes installed",
            PhaseKind::InterConnectivity => "ping across the topology",
            PhaseKind::Flap => "cycle every interface down and up",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-phase state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    Running,
    Passed,
    Failed,
}

/// Whole-run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    InProgress,
    Completed,
    Aborted,
}

/// What to do after the first failing check of a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Stop the phase at the first failing check
    #[default]
    StopAtFirst,
    /// Keep checking the rest of the phase and report every failure
    CollectAll,
}

/// One failed check
#[derive(Debug, Clone, Serialize)]
pub struct CheckFailure {
    /// Error code, see `Error::code`
    pub code: &'static str,
    pub message: String,
}

impl From<&crate::common::Error> for CheckFailure {
    fn from(e: &crate::common::Error) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

/// Outcome of one phase
#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phase: PhaseKind,
    pub status: PhaseStatus,
    pub checks_run: usize,
    pub checks_total: usize,
    pub failures: Vec<CheckFailure>,
    pub elapsed_ms: u64,
}

impl PhaseReport {
    pub fn pending(phase: PhaseKind, checks_total: usize) -> Self {
        Self {
            phase,
            status: PhaseStatus::Pending,
            checks_run: 0,
            checks_total,
            failures: Vec::new(),
            elapsed_ms: 0,
        }
    }

    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    }
}

/// Outcome of running all phases against one variant
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub suite: String,
    pub variant: String,
    pub state: RunState,
    pub phases: Vec<PhaseReport>,
    /// Error that prevented the phases from running (setup, topology)
    pub error: Option<CheckFailure>,
}

impl RunReport {
    pub fn new(suite: &str, variant: &str) -> Self {
        Self {
            suite: suite.to_string(),
            variant: variant.to_string(),
            state: RunState::NotStarted,
            phases: Vec::new(),
            error: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.state == RunState::Completed
            && self.error.is_none()
            && self.phases.iter().all(|p| p.status == PhaseStatus::Passed)
    }

    /// The phase that aborted the run, if any
    pub fn failed_phase(&self) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.status == PhaseStatus::Failed)
    }

    pub fn phase(&self, kind: PhaseKind) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == kind)
    }
}
