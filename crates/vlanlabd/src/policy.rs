//! VLAN and routing policy engine.
//!
//! Pure computation over a [`Topology`]: which sub-interfaces each node gets,
//! which addresses and default route they carry, whether the node forwards,
//! and which VLANs each trunk port allows. No kernel interaction.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use vlanlab_types::{IfName, VlanId};

use crate::topology::{NodeRole, Topology};

/// One VLAN sub-interface with its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanInterfacePolicy {
    pub parent: IfName,
    pub vlan: VlanId,
    pub name: IfName,
    pub address: Ipv4Addr,
    pub prefix_len: u8,
    pub gateway: Option<Ipv4Addr>,
}

/// Default route of a namespaced node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    pub gateway: Ipv4Addr,
    pub device: IfName,
}

/// Everything configured inside one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePolicy {
    pub role: NodeRole,
    pub forwarding: bool,
    /// Served VLANs first (routers), then bindings, in declaration order.
    pub interfaces: Vec<VlanInterfacePolicy>,
    pub default_route: Option<RoutePolicy>,
}

/// Allowed VLANs on one switch port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrunkPortPolicy {
    pub switch: String,
    pub port: IfName,
    pub allowed: BTreeSet<VlanId>,
}

/// Output of [`compute_assignments`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyPlan {
    pub nodes: BTreeMap<String, NodePolicy>,
    pub trunks: Vec<TrunkPortPolicy>,
}

impl PolicyPlan {
    pub fn node(&self, name: &str) -> Option<&NodePolicy> {
        self.nodes.get(name)
    }

    /// Trunk policy of a switch port, if the port carries one.
    pub fn trunk_port(&self, port: &str) -> Option<&TrunkPortPolicy> {
        self.trunks.iter().find(|t| t.port.as_str() == port)
    }
}

/// Derives per-node VLAN interfaces, addresses, default routes, forwarding
/// flags and trunk allow-lists from a validated topology.
pub fn compute_assignments(topology: &Topology) -> PolicyPlan {
    let mut plan = PolicyPlan::default();

    for node in topology.nodes() {
        let mut interfaces = Vec::new();

        if let Some(base) = topology.base_interface(node.name()) {
            for vlan_id in topology.router_vlans(node.name()) {
                let (Some(vlan), Ok(name)) = (
                    topology.vlan(vlan_id),
                    base.ifname.vlan_subinterface(vlan_id),
                ) else {
                    continue;
                };
                interfaces.push(VlanInterfacePolicy {
                    parent: base.ifname.clone(),
                    vlan: vlan_id,
                    name,
                    address: vlan.gateway,
                    prefix_len: vlan.subnet.prefix_len(),
                    gateway: None,
                });
            }
        }

        for binding in topology.bindings_for(node.name()) {
            let (Some(vlan), Some(iface)) = (
                topology.vlan(binding.vlan),
                topology.interface(node.name(), binding.slot),
            ) else {
                continue;
            };
            let Ok(name) = iface.ifname.vlan_subinterface(binding.vlan) else {
                continue;
            };
            interfaces.push(VlanInterfacePolicy {
                parent: iface.ifname.clone(),
                vlan: binding.vlan,
                name,
                address: binding.address,
                prefix_len: vlan.subnet.prefix_len(),
                gateway: binding.gateway,
            });
        }

        let default_route = interfaces.iter().find_map(|i| {
            i.gateway.map(|gateway| RoutePolicy {
                gateway,
                device: i.name.clone(),
            })
        });

        plan.nodes.insert(
            node.name().to_string(),
            NodePolicy {
                role: node.role(),
                forwarding: node.role().can_forward(),
                interfaces,
                default_route,
            },
        );
    }

    for trunk in topology.trunk_policies() {
        let Some(link) = topology.link(trunk.link) else {
            continue;
        };
        for end in link.endpoints() {
            plan.trunks.push(TrunkPortPolicy {
                switch: end.node.clone(),
                port: end.ifname.clone(),
                allowed: trunk.allowed.clone(),
            });
        }
    }

    plan
}
