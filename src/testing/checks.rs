//! Checks performed by each phase
//!
//! A phase expands into an ordered list of [`Check`]s drawn either from
//! the suite's fixture facts or from the topology itself. Each check is
//! run on its own and returns a typed result, so the sequencer decides
//! whether a failure ends the phase.

use std::fmt;
use std::time::Duration;

use crate::common::config::{Polling, Timing};
use crate::common::{expand_str, expand_template, Error, Result};
use crate::exec::{CommandExecutor, DiagnosticDump};
use crate::topology::Topology;

use super::assertion::Pattern;
use super::config::{ExpectedState, Fact, Peering, Probe, Probes, Reach, RoutePresence};
use super::phase::PhaseKind;
use super::poller::{poll_until, PollPolicy};

/// One unit of work within a phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check<'a> {
    /// Ping `reach.target` from `reach.host`, optionally dumping
    /// forwarding state afterwards
    Ping { reach: &'a Reach, dump_after: bool },
    /// The routing daemon runs on `host`
    Daemon { host: &'a str, process: &'a str },
    /// Session towards `peer` reaches Established
    Neighbor(&'a Peering),
    /// `prefix` is installed on `host`
    Route(&'a RoutePresence),
    /// Cycle `interface` (effective identifier) down and up on `host`
    Flap { host: &'a str, interface: String },
}

impl Check<'_> {
    pub fn host(&self) -> &str {
        match self {
            Check::Ping { reach, .. } => &reach.host,
            Check::Daemon { host, .. } | Check::Flap { host, .. } => host,
            Check::Neighbor(p) => &p.host,
            Check::Route(r) => &r.host,
        }
    }
}

impl fmt::Display for Check<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Ping { reach, .. } => write!(f, "{}", reach.fact()),
            Check::Daemon { host, process } => write!(f, "{}", Fact::Runs { host, process }),
            Check::Neighbor(p) => write!(f, "{}", p.fact()),
            Check::Route(r) => write!(f, "{}", r.fact()),
            Check::Flap { host, interface } => write!(f, "{} flaps {}", host, interface),
        }
    }
}

/// Everything the checks need for one variant run
pub struct Harness<'a> {
    pub executor: &'a dyn CommandExecutor,
    pub dump: &'a dyn DiagnosticDump,
    pub topology: &'a Topology,
    pub expect: &'a ExpectedState,
    pub probes: &'a Probes,
    pub polling: &'a Polling,
    pub timing: &'a Timing,
}

impl<'a> Harness<'a> {
    /// Work items for `phase`, in declared order
    pub fn checks(&self, phase: PhaseKind) -> Vec<Check<'a>> {
        let expect = self.expect;
        let topology = self.topology;
        match phase {
            PhaseKind::Connectivity => expect
                .connectivity
                .iter()
                .map(|reach| Check::Ping {
                    reach,
                    dump_after: false,
                })
                .collect(),
            PhaseKind::Daemon => topology
                .routers
                .iter()
                .map(|r| Check::Daemon {
                    host: &r.hostname,
                    process: &expect.daemon.process,
                })
                .collect(),
            PhaseKind::Neighbors => expect.neighbors.iter().map(Check::Neighbor).collect(),
            PhaseKind::Routes => expect.routes.iter().map(Check::Route).collect(),
            PhaseKind::InterConnectivity => expect
                .inter_connectivity
                .iter()
                .map(|reach| Check::Ping {
                    reach,
                    dump_after: true,
                })
                .collect(),
            PhaseKind::Flap => topology
                .interfaces()
                .map(|(router, intf)| Check::Flap {
                    host: &router.hostname,
                    interface: intf.effective_name(),
                })
                .collect(),
        }
    }

    /// Work done once before the first check of `phase`
    pub async fn before_phase(&self, phase: PhaseKind) {
        if phase == PhaseKind::Daemon {
            settle(self.timing.daemon_settle()).await;
        }
    }

    /// Run a single check
    pub async fn run_check(&self, check: &Check<'_>) -> Result<()> {
        let label = check.to_string();
        match check {
            Check::Ping { reach, dump_after } => {
                let vars = [("target", reach.target.as_str())];
                self.expect_probe(&reach.host, &self.probes.ping, &vars, &label)
                    .await?;
                if *dump_after {
                    self.dump_forwarding_state(&label).await;
                }
                Ok(())
            }
            Check::Daemon { host, process } => {
                tracing::info!("Checking {} on {}", process, host);
                let vars = [("process", *process)];
                self.expect_probe(host, &self.probes.daemon, &vars, &label)
                    .await
            }
            Check::Neighbor(peering) => {
                let policy =
                    PollPolicy::new(self.polling.neighbor_attempts, self.polling.interval());
                let vars = [("peer", peering.peer.as_str())];
                self.poll_probe(&peering.host, &self.probes.neighbor, &vars, policy, &label)
                    .await
            }
            Check::Route(route) => {
                let policy = PollPolicy::new(self.polling.route_attempts, self.polling.interval());
                let vars = [("prefix", route.prefix.as_str())];
                self.poll_probe(&route.host, &self.probes.route, &vars, policy, &label)
                    .await
            }
            Check::Flap { host, interface } => {
                let vars = [("interface", interface.as_str())];
                let down = expand_template(&self.probes.link_down, &vars);
                let up = expand_template(&self.probes.link_up, &vars);

                self.executor.execute(host, &down).await?;
                settle(self.timing.flap_settle()).await;
                self.executor.execute(host, &up).await?;
                settle(self.timing.flap_settle()).await;

                self.dump_forwarding_state(&label).await;
                Ok(())
            }
        }
    }

    /// Run `probe` once on `host`; mismatch is fatal
    async fn expect_probe(
        &self,
        host: &str,
        probe: &Probe,
        vars: &[(&str, &str)],
        label: &str,
    ) -> Result<()> {
        let pattern = Pattern::new(&expand_str(&probe.pattern, vars))?;
        let args = expand_template(&probe.command, vars);
        let output = self.executor.execute(host, &args).await?;
        pattern.expect(&output, label)
    }

    /// Poll `probe` on `host` until it matches or `policy` is exhausted
    async fn poll_probe(
        &self,
        host: &str,
        probe: &Probe,
        vars: &[(&str, &str)],
        policy: PollPolicy,
        label: &str,
    ) -> Result<()> {
        let pattern = Pattern::new(&expand_str(&probe.pattern, vars))?;
        let args = expand_template(&probe.command, vars);
        let executor = self.executor;
        let (args, pattern) = (&args, &pattern);

        let attempts = poll_until(policy, label, move || async move {
            let output = executor.execute(host, args).await?;
            Ok::<_, Error>(pattern.matches(&output))
        })
        .await?;

        tracing::debug!(check = label, attempts, "Converged");
        Ok(())
    }

    /// Best-effort forwarding-state dump; failures are logged only
    async fn dump_forwarding_state(&self, after: &str) {
        match self.dump.dump_forwarding_state().await {
            Ok(output) => {
                if !output.is_empty() {
                    tracing::debug!(after, "Forwarding state:\n{}", output.trim_end());
                }
            }
            Err(e) => tracing::warn!(after, error = %e, "Forwarding state dump failed"),
        }
    }
}

async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
