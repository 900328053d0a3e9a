//! Test suite configuration types
//!
//! Defines the data structures for deserializing YAML test suites.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::common::config::{PollingOverrides, TimingOverrides};
use crate::common::paths::resolve_relative;
use crate::common::{Error, Result};
use crate::topology::Topology;

use super::assertion::Pattern;

/// A complete test suite loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct TestSuite {
    /// Name of the suite
    pub name: String,
    /// Optional description of what the suite verifies
    pub description: Option<String>,
    /// Topology flavors the same checks run against
    pub variants: Vec<Variant>,
    /// Facts the run must observe
    pub expect: ExpectedState,
    /// Commands and patterns used by each kind of check
    #[serde(default)]
    pub probes: Probes,
    /// Polling budget overrides for this suite
    pub polling: Option<PollingOverrides>,
    /// Settle delay overrides for this suite
    pub timing: Option<TimingOverrides>,
}

/// One topology flavor of a suite (e.g. plain ethernet, VLAN tagged)
#[derive(Deserialize, Debug)]
pub struct Variant {
    /// Name of the variant
    pub name: String,
    /// Inline topology description
    pub topology: Option<Topology>,
    /// Path to a resolved topology description, relative to the suite file
    pub topology_file: Option<PathBuf>,
    /// Provisioning commands run before the phases
    pub setup: Option<Vec<ShellStep>>,
    /// Cleanup commands run after the phases, whatever their outcome
    pub teardown: Option<Vec<ShellStep>>,
}

/// A shell command run through `sh -c`
#[derive(Deserialize, Debug, Clone)]
pub struct ShellStep {
    pub shell: String,
}

/// Expected facts, grouped by the phase that checks them
#[derive(Deserialize, Debug, Default)]
pub struct ExpectedState {
    /// Reachability checked before any routing has converged
    #[serde(default)]
    pub connectivity: Vec<Reach>,
    /// Routing daemon expected on every router
    #[serde(default)]
    pub daemon: DaemonExpectation,
    /// Sessions that must reach Established
    #[serde(default)]
    pub neighbors: Vec<Peering>,
    /// Prefixes that must appear in the routing table
    #[serde(default)]
    pub routes: Vec<RoutePresence>,
    /// Reachability across the topology once routes have converged
    #[serde(default)]
    pub inter_connectivity: Vec<Reach>,
}

/// `host` can reach `target`
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Reach {
    pub host: String,
    pub target: String,
}

/// `host` has an established session with `peer`
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Peering {
    pub host: String,
    pub peer: String,
}

/// `host` has a route for `prefix`
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RoutePresence {
    pub host: String,
    pub prefix: String,
}

/// Name of the routing daemon process
#[derive(Deserialize, Debug, Clone)]
pub struct DaemonExpectation {
    #[serde(default = "default_process")]
    pub process: String,
}

impl Default for DaemonExpectation {
    fn default() -> Self {
        Self {
            process: default_process(),
        }
    }
}

fn default_process() -> String {
    "bird".to_string()
}

/// A (subject, predicate, target) fact, used to name a check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fact<'a> {
    Reaches { host: &'a str, target: &'a str },
    Runs { host: &'a str, process: &'a str },
    PeersWith { host: &'a str, peer: &'a str },
    HasRoute { host: &'a str, prefix: &'a str },
}

impl Fact<'_> {
    pub fn subject(&self) -> &str {
        match self {
            Fact::Reaches { host, .. }
            | Fact::Runs { host, .. }
            | Fact::PeersWith { host, .. }
            | Fact::HasRoute { host, .. } => host,
        }
    }
}

impl fmt::Display for Fact<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fact::Reaches { host, target } => write!(f, "{} reaches {}", host, target),
            Fact::Runs { host, process } => write!(f, "{} runs {}", host, process),
            Fact::PeersWith { host, peer } => write!(f, "{} peers with {}", host, peer),
            Fact::HasRoute { host, prefix } => write!(f, "{} has route {}", host, prefix),
        }
    }
}

impl Reach {
    pub fn fact(&self) -> Fact<'_> {
        Fact::Reaches {
            host: &self.host,
            target: &self.target,
        }
    }
}

impl Peering {
    pub fn fact(&self) -> Fact<'_> {
        Fact::PeersWith {
            host: &self.host,
            peer: &self.peer,
        }
    }
}

impl RoutePresence {
    pub fn fact(&self) -> Fact<'_> {
        Fact::HasRoute {
            host: &self.host,
            prefix: &self.prefix,
        }
    }
}

impl ExpectedState {
    /// Hosts named as the subject of any fact
    fn subjects(&self) -> impl Iterator<Item = &str> {
        self.connectivity
            .iter()
            .map(|r| r.host.as_str())
            .chain(self.neighbors.iter().map(|p| p.host.as_str()))
            .chain(self.routes.iter().map(|r| r.host.as_str()))
            .chain(self.inter_connectivity.iter().map(|r| r.host.as_str()))
    }
}

/// A command template and the pattern its output must match
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub command: Vec<String>,
    pub pattern: String,
}

impl Probe {
    fn new(command: &[&str], pattern: &str) -> Self {
        Self {
            command: command.iter().map(|s| s.to_string()).collect(),
            pattern: pattern.to_string(),
        }
    }
}

/// Probes for each kind of check
///
/// Templates may use `{target}`, `{peer}`, `{prefix}`, `{interface}` and
/// `{process}`, in both the command and the pattern.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Probes {
    #[serde(default = "default_ping")]
    pub ping: Probe,
    #[serde(default = "default_daemon")]
    pub daemon: Probe,
    #[serde(default = "default_neighbor")]
    pub neighbor: Probe,
    #[serde(default = "default_route")]
    pub route: Probe,
    #[serde(default = "default_link_down")]
    pub link_down: Vec<String>,
    #[serde(default = "default_link_up")]
    pub link_up: Vec<String>,
}

impl Default for Probes {
    fn default() -> Self {
        Self {
            ping: default_ping(),
            daemon: default_daemon(),
            neighbor: default_neighbor(),
            route: default_route(),
            link_down: default_link_down(),
            link_up: default_link_up(),
        }
    }
}

fn default_ping() -> Probe {
    Probe::new(&["ping", "-c3", "{target}"], "[1-3] packets received")
}
fn default_daemon() -> Probe {
    Probe::new(&["ps", "ax"], ".*{process}.*")
}
fn default_neighbor() -> Probe {
    Probe::new(
        &["birdc", "show", "protocols", "all", "{peer}"],
        ".*Established.*",
    )
}
fn default_route() -> Probe {
    Probe::new(&["ip", "route", "show", "{prefix}"], "{prefix}")
}
fn default_link_down() -> Vec<String> {
    vec!["ip".into(), "link".into(), "set".into(), "down".into(), "{interface}".into()]
}
fn default_link_up() -> Vec<String> {
    vec!["ip".into(), "link".into(), "set".into(), "up".into(), "{interface}".into()]
}

impl TestSuite {
    /// Load and parse a suite file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read test suite '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let suite: TestSuite = serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse test suite: {}", e)))?;

        if suite.variants.is_empty() {
            return Err(Error::Config(format!(
                "Suite '{}' defines no variants",
                suite.name
            )));
        }
        let mut names = HashSet::new();
        for variant in &suite.variants {
            if !names.insert(variant.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate variant name '{}'",
                    variant.name
                )));
            }
        }
        Ok(suite)
    }

    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Check that every fact names a router of `topology`
    pub fn check_hosts(&self, topology: &Topology) -> Result<()> {
        for host in self.expect.subjects() {
            topology.require(host)?;
        }
        Ok(())
    }

    /// Compile every static pattern so typos fail before any phase runs
    ///
    /// Patterns with placeholders are compiled once per check instead.
    pub fn check_patterns(&self) -> Result<()> {
        for probe in [
            &self.probes.ping,
            &self.probes.daemon,
            &self.probes.neighbor,
            &self.probes.route,
        ] {
            if !probe.pattern.contains('{') {
                Pattern::new(&probe.pattern)?;
            }
        }
        Ok(())
    }
}

impl Variant {
    /// Resolve this variant's topology, reading `topology_file` if needed
    pub fn resolve_topology(&self, suite_path: &Path) -> Result<Topology> {
        match (&self.topology, &self.topology_file) {
            (Some(topology), None) => {
                topology.validate()?;
                Ok(topology.clone())
            }
            (None, Some(file)) => Topology::load(&resolve_relative(suite_path, file)),
            (Some(_), Some(_)) => Err(Error::Config(format!(
                "Variant '{}' sets both 'topology' and 'topology_file'",
                self.name
            ))),
            (None, None) => Err(Error::Config(format!(
                "Variant '{}' needs 'topology' or 'topology_file'",
                self.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUITE: &str = r#"
name: bgp
variants:
  - name: eth
    topology:
      routers:
        - hostname: R1
          interfaces: [{ name: eth-4-0 }]
        - hostname: R2
          interfaces: [{ name: eth-5-0 }]
  - name: vlan
    topology_file: vlan/topology.yaml
    setup:
      - shell: "true"
expect:
  connectivity:
    - { host: R1, target: 192.168.120.10 }
  neighbors:
    - { host: R1, peer: R2 }
  routes:
    - { host: R2, prefix: 192.168.150.0/24 }
probes:
  ping:
    command: [ping, -c1, "{target}"]
    pattern: "1 received"
polling:
  route_attempts: 5
"#;

    #[test]
    fn test_parse_suite() {
        let suite = TestSuite::from_yaml_str(SUITE).unwrap();
        assert_eq!(suite.name, "bgp");
        assert_eq!(suite.variants.len(), 2);
        assert_eq!(suite.expect.connectivity.len(), 1);
        assert_eq!(suite.expect.daemon.process, "bird");
        assert!(suite.expect.inter_connectivity.is_empty());
        assert_eq!(suite.probes.ping.command, vec!["ping", "-c1", "{target}"]);
        // Untouched probes keep their defaults
        assert_eq!(suite.probes.neighbor, default_neighbor());
        assert_eq!(suite.polling.as_ref().unwrap().route_attempts, Some(5));
        assert!(suite.variant("vlan").unwrap().setup.is_some());
    }

    #[test]
    fn test_inline_topology_resolves() {
        let suite = TestSuite::from_yaml_str(SUITE).unwrap();
        let topology = suite
            .variant("eth")
            .unwrap()
            .resolve_topology(Path::new("suite.yaml"))
            .unwrap();
        assert_eq!(topology.routers.len(), 2);
        suite.check_hosts(&topology).unwrap();
    }

    #[test]
    fn test_topology_file_resolves_relative_to_suite() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("vlan")).unwrap();
        std::fs::write(
            dir.path().join("vlan/topology.yaml"),
            "routers:\n  - hostname: R1\n    interfaces:\n      - { name: eth-4-0, vlan: 10 }\n",
        )
        .unwrap();

        let suite = TestSuite::from_yaml_str(SUITE).unwrap();
        let topology = suite
            .variant("vlan")
            .unwrap()
            .resolve_topology(&dir.path().join("suite.yaml"))
            .unwrap();
        assert_eq!(topology.routers[0].interfaces[0].effective_name(), "eth-4-0.10");

        // R2 is named by a route fact but missing from this topology
        assert!(matches!(
            suite.check_hosts(&topology),
            Err(Error::UnknownHost(h)) if h == "R2"
        ));
    }

    #[test]
    fn test_rejects_duplicate_variants() {
        let yaml = r#"
name: x
variants:
  - { name: a, topology_file: t.yaml }
  - { name: a, topology_file: t.yaml }
expect: {}
"#;
        assert!(TestSuite::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_rejects_empty_variants() {
        assert!(TestSuite::from_yaml_str("name: x\nvariants: []\nexpect: {}\n").is_err());
    }

    #[test]
    fn test_fact_display() {
        let peering = Peering {
            host: "R1".into(),
            peer: "R4".into(),
        };
        assert_eq!(peering.fact().to_string(), "R1 peers with R4");
        assert_eq!(peering.fact().subject(), "R1");
    }

    #[test]
    fn test_check_patterns_catches_typos() {
        let mut suite = TestSuite::from_yaml_str(SUITE).unwrap();
        suite.check_patterns().unwrap();
        suite.probes.ping.pattern = "(unclosed".to_string();
        assert!(matches!(
            suite.check_patterns(),
            Err(Error::InvalidPattern { .. })
        ));
    }
}
