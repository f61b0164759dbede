//! Topology file support.
//!
//! Loads a declarative topology from TOML:
//!
//! ```toml
//! name = "lab"
//!
//! [[vlans]]
//! id = 10
//! subnet = "172.16.1.0/26"
//! gateway = "172.16.1.1"
//!
//! [[nodes]]
//! name = "h1"
//! role = "host"
//! bindings = [{ vlan = 10, ip = "172.16.1.2", gateway = "172.16.1.1" }]
//!
//! [[nodes]]
//! name = "s1"
//! role = "switch"
//!
//! [[links]]
//! endpoints = ["h1", "s1"]
//! ```
//!
//! VLAN ids stay raw integers here so that bad ids are reported by topology
//! validation with node context.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use vlanlab_types::Ipv4Prefix;

use crate::error::ConfigError;
use crate::topology::{NodeRole, Topology, TopologyBuilder};

fn default_topology_name() -> String {
    "topology".to_string()
}

/// A `[[vlans]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VlanEntry {
    pub id: u16,
    pub subnet: Ipv4Prefix,
    pub gateway: Ipv4Addr,
}

/// A node binding: `{ vlan, ip, gateway?, slot? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingEntry {
    pub vlan: u16,
    pub ip: Ipv4Addr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<Ipv4Addr>,
    /// Interface slot; defaults to the node's base interface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<u16>,
}

/// A `[[nodes]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeEntry {
    pub name: String,
    pub role: NodeRole,
    /// VLANs served by a router.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub serves: Vec<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<BindingEntry>,
}

/// A `[[links]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkEntry {
    pub endpoints: [String; 2],
    /// Explicit trunk allow-list (switch-to-switch links only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trunk: Option<Vec<u16>>,
}

/// Root of a topology file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopologyFile {
    #[serde(default = "default_topology_name")]
    pub name: String,
    #[serde(default)]
    pub vlans: Vec<VlanEntry>,
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
    #[serde(default)]
    pub links: Vec<LinkEntry>,
}

impl TopologyFile {
    /// Converts the file into an unvalidated builder.
    pub fn into_builder(self) -> TopologyBuilder {
        let mut builder = TopologyBuilder::new(self.name);

        for vlan in self.vlans {
            builder = builder.vlan(
                vlan.id,
                vlan.subnet.network(),
                vlan.subnet.prefix_len(),
                vlan.gateway,
            );
        }

        for node in self.nodes {
            builder = builder.node(node.name.clone(), node.role);
            if !node.serves.is_empty() {
                builder = builder.serve(node.name.clone(), node.serves);
            }
            for binding in node.bindings {
                builder = match binding.slot {
                    Some(slot) => builder.bind_on_slot(
                        node.name.clone(),
                        slot,
                        binding.vlan,
                        binding.ip,
                        binding.gateway,
                    ),
                    None => builder.bind(node.name.clone(), binding.vlan, binding.ip, binding.gateway),
                };
            }
        }

        for link in self.links {
            let [a, b] = link.endpoints;
            builder = match link.trunk {
                Some(trunk) => builder.trunk_link(a, b, trunk),
                None => builder.link(a, b),
            };
        }

        builder
    }
}

/// Parses and validates a TOML topology.
pub fn parse_topology(content: &str) -> Result<Topology, ConfigError> {
    let file: TopologyFile = toml::from_str(content)?;
    Ok(file.into_builder().build()?)
}

/// Reads, parses and validates a topology file.
pub fn load_topology(path: impl AsRef<Path>) -> Result<Topology, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_topology(&content)
}
