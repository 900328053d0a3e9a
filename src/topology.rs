//! Topology model
//!
//! The resolved description of the routers under test. Templating and
//! provisioning happen elsewhere; this module only reads the result and
//! supplies the iteration domains for the phases.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::common::{Error, Result};

/// Ordered collection of routers, immutable once loaded
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Topology {
    pub routers: Vec<Router>,
}

/// A router, identified by its hostname
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Router {
    pub hostname: String,
    #[serde(default, alias = "intfs")]
    pub interfaces: Vec<Interface>,
}

/// A network interface, optionally VLAN tagged
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    /// VLAN tag; empty means untagged
    #[serde(default, deserialize_with = "vlan_tag", skip_serializing_if = "String::is_empty")]
    pub vlan: String,
}

/// Accept `vlan: 100` as well as `vlan: "100"`
fn vlan_tag<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tag {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<Tag>::deserialize(deserializer)? {
        Some(Tag::Text(s)) => s,
        Some(Tag::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

impl Interface {
    pub fn new(name: impl Into<String>, vlan: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vlan: vlan.into(),
        }
    }

    pub fn is_tagged(&self) -> bool {
        !self.vlan.is_empty()
    }

    /// Identifier used in commands: `name` when untagged, `name.vlan` when tagged
    pub fn effective_name(&self) -> String {
        if self.is_tagged() {
            format!("{}.{}", self.name, self.vlan)
        } else {
            self.name.clone()
        }
    }
}

impl Topology {
    /// Parse and validate a topology from YAML
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let topology: Topology = serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse topology: {}", e)))?;
        topology.validate()?;
        Ok(topology)
    }

    /// Load a topology from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Check hostname uniqueness and that every name is non-empty
    pub fn validate(&self) -> Result<()> {
        if self.routers.is_empty() {
            return Err(Error::Config("Topology has no routers".to_string()));
        }

        let mut seen = HashSet::new();
        for router in &self.routers {
            if router.hostname.is_empty() {
                return Err(Error::Config("Router with empty hostname".to_string()));
            }
            if !seen.insert(router.hostname.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate router hostname '{}'",
                    router.hostname
                )));
            }
            if let Some(intf) = router.interfaces.iter().find(|i| i.name.is_empty()) {
                return Err(Error::Config(format!(
                    "Router '{}' has an interface with an empty name (vlan '{}')",
                    router.hostname, intf.vlan
                )));
            }
        }
        Ok(())
    }

    pub fn router(&self, hostname: &str) -> Option<&Router> {
        self.routers.iter().find(|r| r.hostname == hostname)
    }

    /// Fail with `UnknownHost` unless `hostname` is part of the topology
    pub fn require(&self, hostname: &str) -> Result<&Router> {
        self.router(hostname)
            .ok_or_else(|| Error::UnknownHost(hostname.to_string()))
    }

    /// Every router × interface pair, in declared order
    pub fn interfaces(&self) -> impl Iterator<Item = (&Router, &Interface)> {
        self.routers
            .iter()
            .flat_map(|r| r.interfaces.iter().map(move |i| (r, i)))
    }

    pub fn interface_count(&self) -> usize {
        self.routers.iter().map(|r| r.interfaces.len()).sum()
    }
}
