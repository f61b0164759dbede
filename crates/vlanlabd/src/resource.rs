//! Kernel resource primitives.
//!
//! A [`Resource`] is a value describing one kernel object (namespace, switch,
//! veth link, VLAN sub-interface, address, forwarding flag, trunk policy,
//! default route) together with the commands that create and destroy it. A
//! [`Handle`] marks a resource that a backend has actually created.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;
use vlanlab_common::ShellCommand;
use vlanlab_types::{IfName, VlanId};

use crate::commands::*;

/// Where one end of a veth link lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attachment {
    /// Inside a node namespace.
    Netns(String),
    /// Root namespace, attached as a port of a virtual switch.
    Switch(String),
}

impl Attachment {
    pub fn netns(&self) -> Option<&str> {
        match self {
            Attachment::Netns(ns) => Some(ns.as_str()),
            Attachment::Switch(_) => None,
        }
    }

    pub fn switch(&self) -> Option<&str> {
        match self {
            Attachment::Switch(sw) => Some(sw.as_str()),
            Attachment::Netns(_) => None,
        }
    }
}

/// One end of a veth link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkEnd {
    pub attach: Attachment,
    pub ifname: IfName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Namespace,
    Switch,
    Link,
    VlanInterface,
    Address,
    Forwarding,
    Trunk,
    DefaultRoute,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Namespace => "namespace",
            ResourceKind::Switch => "switch",
            ResourceKind::Link => "link",
            ResourceKind::VlanInterface => "vlan interface",
            ResourceKind::Address => "address",
            ResourceKind::Forwarding => "forwarding",
            ResourceKind::Trunk => "trunk",
            ResourceKind::DefaultRoute => "default route",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Teardown phases, in destroy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TeardownPhase {
    Routes,
    Trunks,
    Addresses,
    VlanInterfaces,
    Links,
    Forwarding,
    Nodes,
}

/// A kernel object the orchestrator can create and destroy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    Namespace {
        name: String,
    },
    Switch {
        name: String,
    },
    Link {
        a: LinkEnd,
        b: LinkEnd,
    },
    VlanInterface {
        netns: String,
        parent: IfName,
        vlan: VlanId,
        name: IfName,
    },
    Address {
        netns: String,
        device: IfName,
        address: Ipv4Addr,
        prefix_len: u8,
    },
    Forwarding {
        netns: String,
    },
    Trunk {
        switch: String,
        port: IfName,
        vlans: BTreeSet<VlanId>,
    },
    DefaultRoute {
        netns: String,
        gateway: Ipv4Addr,
        device: IfName,
    },
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Namespace { .. } => ResourceKind::Namespace,
            Resource::Switch { .. } => ResourceKind::Switch,
            Resource::Link { .. } => ResourceKind::Link,
            Resource::VlanInterface { .. } => ResourceKind::VlanInterface,
            Resource::Address { .. } => ResourceKind::Address,
            Resource::Forwarding { .. } => ResourceKind::Forwarding,
            Resource::Trunk { .. } => ResourceKind::Trunk,
            Resource::DefaultRoute { .. } => ResourceKind::DefaultRoute,
        }
    }

    pub fn teardown_phase(&self) -> TeardownPhase {
        match self.kind() {
            ResourceKind::DefaultRoute => TeardownPhase::Routes,
            ResourceKind::Trunk => TeardownPhase::Trunks,
            ResourceKind::Address => TeardownPhase::Addresses,
            ResourceKind::VlanInterface => TeardownPhase::VlanInterfaces,
            ResourceKind::Link => TeardownPhase::Links,
            ResourceKind::Forwarding => TeardownPhase::Forwarding,
            ResourceKind::Namespace | ResourceKind::Switch => TeardownPhase::Nodes,
        }
    }

    /// Commands that create the resource, in order.
    pub fn create_commands(&self) -> Vec<ShellCommand> {
        match self {
            Resource::Namespace { name } => {
                vec![build_netns_add_cmd(name), build_netns_loopback_up_cmd(name)]
            }
            Resource::Switch { name } => {
                vec![build_add_bridge_cmd(name), build_link_up_cmd(None, name)]
            }
            Resource::Link { a, b } => {
                let mut cmds = vec![build_add_veth_cmd(
                    a.ifname.as_str(),
                    a.attach.netns(),
                    b.ifname.as_str(),
                    b.attach.netns(),
                )];
                for end in [a, b] {
                    if let Attachment::Switch(sw) = &end.attach {
                        cmds.push(build_add_port_cmd(sw, end.ifname.as_str()));
                    }
                    cmds.push(build_link_up_cmd(end.attach.netns(), end.ifname.as_str()));
                }
                cmds
            }
            Resource::VlanInterface {
                netns,
                parent,
                vlan,
                name,
            } => vec![
                build_flush_addr_cmd(netns, parent.as_str()),
                build_add_vlan_subintf_cmd(netns, parent.as_str(), name.as_str(), *vlan),
                build_link_up_cmd(Some(netns.as_str()), name.as_str()),
            ],
            Resource::Address {
                netns,
                device,
                address,
                prefix_len,
            } => vec![build_add_addr_cmd(netns, device.as_str(), *address, *prefix_len)],
            Resource::Forwarding { netns } => vec![build_set_forwarding_cmd(netns, true)],
            Resource::Trunk { port, vlans, .. } => vec![build_set_trunk_cmd(port.as_str(), vlans)],
            Resource::DefaultRoute {
                netns,
                gateway,
                device,
            } => vec![build_add_default_route_cmd(netns, *gateway, device.as_str())],
        }
    }

    /// Commands that destroy the resource, in order.
    pub fn destroy_commands(&self) -> Vec<ShellCommand> {
        match self {
            Resource::Namespace { name } => vec![build_netns_del_cmd(name)],
            Resource::Switch { name } => vec![build_del_bridge_cmd(name)],
            Resource::Link { a, b } => {
                let mut cmds: Vec<ShellCommand> = [a, b]
                    .into_iter()
                    .filter_map(|end| {
                        end.attach
                            .switch()
                            .map(|sw| build_del_port_cmd(sw, end.ifname.as_str()))
                    })
                    .collect();
                cmds.push(build_del_link_cmd(a.attach.netns(), a.ifname.as_str()));
                cmds
            }
            Resource::VlanInterface { netns, name, .. } => {
                vec![build_del_link_cmd(Some(netns.as_str()), name.as_str())]
            }
            Resource::Address {
                netns,
                device,
                address,
                prefix_len,
            } => vec![build_del_addr_cmd(netns, device.as_str(), *address, *prefix_len)],
            Resource::Forwarding { netns } => vec![build_set_forwarding_cmd(netns, false)],
            Resource::Trunk { port, .. } => vec![build_clear_trunk_cmd(port.as_str())],
            Resource::DefaultRoute {
                netns,
                gateway,
                device,
            } => vec![build_del_default_route_cmd(netns, *gateway, device.as_str())],
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Namespace { name } => write!(f, "namespace {}", name),
            Resource::Switch { name } => write!(f, "switch {}", name),
            Resource::Link { a, b } => write!(f, "link {} <-> {}", a.ifname, b.ifname),
            Resource::VlanInterface { netns, name, .. } => {
                write!(f, "vlan interface {} in {}", name, netns)
            }
            Resource::Address {
                netns,
                device,
                address,
                prefix_len,
            } => write!(f, "address {}/{} on {} in {}", address, prefix_len, device, netns),
            Resource::Forwarding { netns } => write!(f, "forwarding in {}", netns),
            Resource::Trunk { port, vlans, .. } => {
                write!(f, "trunk {} [{}]", port, VlanId::join(vlans))
            }
            Resource::DefaultRoute {
                netns,
                gateway,
                device,
            } => write!(f, "default route via {} dev {} in {}", gateway, device, netns),
        }
    }
}

/// A resource that has been created and must be destroyed before the session
/// ends.
#[derive(Debug)]
pub struct Handle {
    resource: Resource,
    created_at: DateTime<Utc>,
}

impl Handle {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            created_at: Utc::now(),
        }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.resource, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ifname(s: &str) -> IfName {
        IfName::new(s).unwrap()
    }

    fn rendered(cmds: Vec<ShellCommand>) -> Vec<String> {
        cmds.iter().map(|c| c.to_string()).collect()
    }

    fn host_link() -> Resource {
        Resource::Link {
            a: LinkEnd {
                attach: Attachment::Netns("h1".to_string()),
                ifname: ifname("h1-eth0"),
            },
            b: LinkEnd {
                attach: Attachment::Switch("s1".to_string()),
                ifname: ifname("s1-eth1"),
            },
        }
    }

    #[test]
    fn test_link_commands() {
        let link = host_link();
        assert_eq!(link.to_string(), "link h1-eth0 <-> s1-eth1");
        assert_eq!(
            rendered(link.create_commands()),
            vec![
                "/sbin/ip link add h1-eth0 netns h1 type veth peer name s1-eth1",
                "/sbin/ip -n h1 link set h1-eth0 up",
                "/usr/bin/ovs-vsctl add-port s1 s1-eth1",
                "/sbin/ip link set s1-eth1 up",
            ]
        );
        assert_eq!(
            rendered(link.destroy_commands()),
            vec![
                "/usr/bin/ovs-vsctl --if-exists del-port s1 s1-eth1",
                "/sbin/ip -n h1 link del h1-eth0",
            ]
        );
    }

    #[test]
    fn test_vlan_interface_commands() {
        let res = Resource::VlanInterface {
            netns: "h1".to_string(),
            parent: ifname("h1-eth0"),
            vlan: VlanId::new(10).unwrap(),
            name: ifname("h1-eth0.10"),
        };
        assert_eq!(
            rendered(res.create_commands()),
            vec![
                "/sbin/ip -n h1 addr flush dev h1-eth0",
                "/sbin/ip -n h1 link add link h1-eth0 name h1-eth0.10 type vlan id 10",
                "/sbin/ip -n h1 link set h1-eth0.10 up",
            ]
        );
        assert_eq!(
            rendered(res.destroy_commands()),
            vec!["/sbin/ip -n h1 link del h1-eth0.10"]
        );
        assert_eq!(res.teardown_phase(), TeardownPhase::VlanInterfaces);
    }

    #[test]
    fn test_teardown_phase_order() {
        assert!(TeardownPhase::Routes < TeardownPhase::Trunks);
        assert!(TeardownPhase::Trunks < TeardownPhase::Addresses);
        assert!(TeardownPhase::Addresses < TeardownPhase::VlanInterfaces);
        assert!(TeardownPhase::VlanInterfaces < TeardownPhase::Links);
        assert!(TeardownPhase::Links < TeardownPhase::Forwarding);
        assert!(TeardownPhase::Forwarding < TeardownPhase::Nodes);

        let ns = Resource::Namespace {
            name: "h1".to_string(),
        };
        assert_eq!(ns.teardown_phase(), TeardownPhase::Nodes);
        assert_eq!(ns.kind(), ResourceKind::Namespace);
    }

    #[test]
    fn test_trunk_display() {
        let trunk = Resource::Trunk {
            switch: "s1".to_string(),
            port: ifname("s1-eth4"),
            vlans: [10, 20, 30]
                .into_iter()
                .map(|v| VlanId::new(v).unwrap())
                .collect(),
        };
        assert_eq!(trunk.to_string(), "trunk s1-eth4 [10,20,30]");
        assert_eq!(trunk.teardown_phase(), TeardownPhase::Trunks);
    }

    #[test]
    fn test_handle() {
        let handle = Handle::new(host_link());
        assert_eq!(handle.resource().kind(), ResourceKind::Link);
        assert!(handle.created_at() <= Utc::now());
    }
}
