//! Scripted executor and fixtures for unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::common::config::{Polling, Timing};
use crate::common::{Error, Result};
use crate::exec::{CommandExecutor, DiagnosticDump};
use crate::topology::Topology;

use super::checks::Harness;
use super::config::{ExpectedState, Peering, Probes, Reach, RoutePresence};

type Responder = Box<dyn Fn(&str, &[String], usize) -> Result<String> + Send + Sync>;

/// Executor answering from a closure and recording every call
///
/// The closure receives the host, the arguments and the 1-based call
/// number.
pub struct ScriptedExecutor {
    respond: Responder,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&str, &[String], usize) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers every default probe with matching output
    pub fn converged() -> Self {
        Self::new(|_, args, _| Ok(healthy_output(args)))
    }

    /// Recorded calls as `host: arg arg ...`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

/// Output a healthy router would give for one of the default probes
pub fn healthy_output(args: &[String]) -> String {
    match args.first().map(String::as_str) {
        Some("ping") => "3 packets transmitted, 3 packets received, 0% packet loss".to_string(),
        Some("ps") => {
            "  PID TTY STAT TIME COMMAND\n   42 ?  Ss  0:00 bird -c /etc/bird/bird.conf".to_string()
        }
        Some("birdc") => "BGP1 BGP master up 10:00:00 Established".to_string(),
        Some("ip") if args.get(1).map(String::as_str) == Some("route") => {
            format!("{} via 10.0.0.1 dev eth0 proto bird", args[3])
        }
        _ => String::new(),
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, host: &str, args: &[String]) -> Result<String> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(format!("{}: {}", host, args.join(" ")));
            calls.len()
        };
        (self.respond)(host, args, n)
    }
}

/// Dump that always fails
pub struct FailingDump;

#[async_trait]
impl DiagnosticDump for FailingDump {
    async fn dump_forwarding_state(&self) -> Result<String> {
        Err(Error::execution("localhost", &["vnet", "show", "ip", "fib"], "not found"))
    }
}

/// Dump that succeeds and counts how often it ran
#[derive(Default)]
pub struct CountingDump {
    calls: AtomicUsize,
}

impl CountingDump {
    /// Dumps taken so far, resetting the counter
    pub fn take(&self) -> usize {
        self.calls.swap(0, Ordering::SeqCst)
    }
}

#[async_trait]
impl DiagnosticDump for CountingDump {
    async fn dump_forwarding_state(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("192.168.150.0/24 via 192.168.120.5".to_string())
    }
}

/// Owned inputs for a [`Harness`]
pub struct Fixture {
    pub topology: Topology,
    pub expect: ExpectedState,
    pub probes: Probes,
    pub polling: Polling,
    pub timing: Timing,
}

impl Fixture {
    /// Two routers, three interfaces, two of them VLAN tagged
    pub fn vlan() -> Self {
        let topology = Topology::from_yaml_str(
            r#"
routers:
  - hostname: R1
    interfaces:
      - { name: eth-4-0, vlan: 10 }
      - { name: eth-24-0 }
  - hostname: R2
    interfaces:
      - { name: eth-5-0, vlan: 20 }
"#,
        )
        .unwrap();

        let expect = ExpectedState {
            connectivity: vec![
                reach("R1", "192.168.120.10"),
                reach("R2", "192.168.120.5"),
            ],
            neighbors: vec![
                Peering {
                    host: "R1".into(),
                    peer: "R2".into(),
                },
                Peering {
                    host: "R2".into(),
                    peer: "R1".into(),
                },
            ],
            routes: vec![RoutePresence {
                host: "R2".into(),
                prefix: "192.168.150.0/24".into(),
            }],
            inter_connectivity: vec![reach("R1", "192.168.222.2")],
            ..Default::default()
        };

        Self {
            topology,
            expect,
            probes: Probes::default(),
            polling: Polling {
                neighbor_attempts: 5,
                route_attempts: 4,
                interval_ms: 1000,
            },
            timing: Timing {
                daemon_settle_ms: 1000,
                flap_settle_ms: 1000,
            },
        }
    }

    pub fn harness<'a>(
        &'a self,
        executor: &'a dyn CommandExecutor,
        dump: &'a dyn DiagnosticDump,
    ) -> Harness<'a> {
        Harness {
            executor,
            dump,
            topology: &self.topology,
            expect: &self.expect,
            probes: &self.probes,
            polling: &self.polling,
            timing: &self.timing,
        }
    }
}

pub fn reach(host: &str, target: &str) -> Reach {
    Reach {
        host: host.into(),
        target: target.into(),
    }
}
