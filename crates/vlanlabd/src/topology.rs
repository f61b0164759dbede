//! Declarative topology model.
//!
//! A [`Topology`] is a validated, immutable graph of nodes, veth links, VLAN
//! assignments, host bindings and trunk policies. It is only obtainable from
//! [`TopologyBuilder::build`], which rejects every inconsistency before a
//! single kernel resource is created.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::net::Ipv4Addr;
use vlanlab_types::{IfName, Ipv4Prefix, VlanId};

use crate::error::TopologyValidationError;

/// Index of a link in [`Topology::links`].
pub type LinkId = usize;

/// Role of a node. Capabilities are queried, not inherited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Host,
    Switch,
    Router,
}

impl NodeRole {
    /// Hosts and routers live in their own network namespace.
    pub fn is_namespaced(&self) -> bool {
        matches!(self, NodeRole::Host | NodeRole::Router)
    }

    /// Only routers forward IP traffic.
    pub fn can_forward(&self) -> bool {
        matches!(self, NodeRole::Router)
    }

    /// Whether VLAN sub-interfaces may be bound on this node's interfaces.
    pub fn can_bind_vlan(&self) -> bool {
        self.is_namespaced()
    }

    /// First interface slot number (`h1-eth0`, `s1-eth1`).
    pub fn first_slot(&self) -> u16 {
        match self {
            NodeRole::Switch => 1,
            NodeRole::Host | NodeRole::Router => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Host => "host",
            NodeRole::Switch => "switch",
            NodeRole::Router => "router",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A host, switch or router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: String,
    role: NodeRole,
    links: Vec<LinkId>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    /// Attached links in declaration order.
    pub fn links(&self) -> &[LinkId] {
        &self.links
    }
}

/// One end of a link: the node, its interface slot and the kernel name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub node: String,
    pub slot: u16,
    pub ifname: IfName,
}

/// A veth pair between two nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    id: LinkId,
    endpoints: [Endpoint; 2],
}

impl Link {
    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn endpoints(&self) -> &[Endpoint; 2] {
        &self.endpoints
    }

    /// The endpoint on `node`, if the link touches it.
    pub fn end_of(&self, node: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.node == node)
    }

    /// The endpoint opposite `node`.
    pub fn other_end(&self, node: &str) -> Option<&Endpoint> {
        match &self.endpoints {
            [a, b] if a.node == node => Some(b),
            [a, b] if b.node == node => Some(a),
            _ => None,
        }
    }
}

/// A declared VLAN: tag, subnet and gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlanAssignment {
    pub id: VlanId,
    pub subnet: Ipv4Prefix,
    pub gateway: Ipv4Addr,
}

impl VlanAssignment {
    pub fn netmask(&self) -> Ipv4Addr {
        self.subnet.netmask()
    }
}

/// Membership of a node interface in a VLAN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostBinding {
    pub node: String,
    pub vlan: VlanId,
    pub address: Ipv4Addr,
    pub gateway: Option<Ipv4Addr>,
    pub slot: u16,
}

/// VLANs carried on an inter-switch link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrunkPolicy {
    pub link: LinkId,
    pub allowed: BTreeSet<VlanId>,
    /// False when the allow-list defaulted to every declared VLAN.
    pub explicit: bool,
}

/// A validated topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    name: String,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    links: Vec<Link>,
    vlans: BTreeMap<VlanId, VlanAssignment>,
    bindings: Vec<HostBinding>,
    served: BTreeMap<String, BTreeSet<VlanId>>,
    trunks: Vec<TrunkPolicy>,
}

impl Topology {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Links in declaration order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// Names of the nodes directly linked to `name`, in link order.
    pub fn neighbors(&self, name: &str) -> Vec<&str> {
        let Some(node) = self.node(name) else {
            return Vec::new();
        };
        node.links
            .iter()
            .filter_map(|&id| self.links[id].other_end(name))
            .map(|e| e.node.as_str())
            .collect()
    }

    pub fn vlans(&self) -> impl Iterator<Item = &VlanAssignment> {
        self.vlans.values()
    }

    pub fn vlan(&self, id: VlanId) -> Option<&VlanAssignment> {
        self.vlans.get(&id)
    }

    /// Host bindings in declaration order.
    pub fn bindings(&self) -> &[HostBinding] {
        &self.bindings
    }

    pub fn bindings_for<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a HostBinding> {
        self.bindings.iter().filter(move |b| b.node == node)
    }

    /// VLANs served by router `node` (empty for other nodes).
    pub fn router_vlans(&self, node: &str) -> impl Iterator<Item = VlanId> + '_ {
        self.served.get(node).into_iter().flatten().copied()
    }

    pub fn trunk_policies(&self) -> &[TrunkPolicy] {
        &self.trunks
    }

    /// Whether both ends of `link` are switches.
    pub fn is_inter_switch(&self, link: &Link) -> bool {
        link.endpoints
            .iter()
            .all(|e| self.node(&e.node).map(Node::role) == Some(NodeRole::Switch))
    }

    /// Kernel interface name of an endpoint.
    pub fn interface_name<'a>(&self, endpoint: &'a Endpoint) -> &'a IfName {
        &endpoint.ifname
    }

    /// The endpoint of `node` in interface slot `slot`.
    pub fn interface(&self, node: &str, slot: u16) -> Option<&Endpoint> {
        let node = self.node(node)?;
        node.links
            .iter()
            .filter_map(|&id| self.links[id].end_of(&node.name))
            .find(|e| e.slot == slot)
    }

    /// The first interface of `node` (`h1-eth0`, `s1-eth1`).
    pub fn base_interface(&self, node: &str) -> Option<&Endpoint> {
        let role = self.node(node)?.role;
        self.interface(node, role.first_slot())
    }
}

#[derive(Debug, Clone)]
struct VlanDecl {
    id: u16,
    network: Ipv4Addr,
    prefix_len: u8,
    gateway: Ipv4Addr,
}

#[derive(Debug, Clone)]
struct BindingDecl {
    node: String,
    vlan: u16,
    address: Ipv4Addr,
    gateway: Option<Ipv4Addr>,
    slot: Option<u16>,
}

#[derive(Debug, Clone)]
struct LinkDecl {
    a: String,
    b: String,
    trunk: Option<Vec<u16>>,
}

/// Collects a topology description and validates it in [`build`].
///
/// [`build`]: TopologyBuilder::build
#[derive(Debug, Clone, Default)]
pub struct TopologyBuilder {
    name: String,
    nodes: Vec<(String, NodeRole)>,
    serves: Vec<(String, Vec<u16>)>,
    vlans: Vec<VlanDecl>,
    bindings: Vec<BindingDecl>,
    links: Vec<LinkDecl>,
}

impl TopologyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn node(mut self, name: impl Into<String>, role: NodeRole) -> Self {
        self.nodes.push((name.into(), role));
        self
    }

    pub fn host(self, name: impl Into<String>) -> Self {
        self.node(name, NodeRole::Host)
    }

    pub fn switch(self, name: impl Into<String>) -> Self {
        self.node(name, NodeRole::Switch)
    }

    /// Declares a router serving the given VLANs.
    pub fn router<I>(self, name: impl Into<String>, serves: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        let name = name.into();
        self.node(name.clone(), NodeRole::Router).serve(name, serves)
    }

    /// Adds VLANs served by `node`.
    pub fn serve<I>(mut self, node: impl Into<String>, vlans: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.serves.push((node.into(), vlans.into_iter().collect()));
        self
    }

    pub fn vlan(mut self, id: u16, network: Ipv4Addr, prefix_len: u8, gateway: Ipv4Addr) -> Self {
        self.vlans.push(VlanDecl {
            id,
            network,
            prefix_len,
            gateway,
        });
        self
    }

    /// Binds `node`'s base interface to `vlan` with `address`.
    pub fn bind(
        self,
        node: impl Into<String>,
        vlan: u16,
        address: Ipv4Addr,
        gateway: Option<Ipv4Addr>,
    ) -> Self {
        self.bind_slot(node, vlan, address, gateway, None)
    }

    /// Binds a specific interface slot of `node` to `vlan`.
    pub fn bind_on_slot(
        self,
        node: impl Into<String>,
        slot: u16,
        vlan: u16,
        address: Ipv4Addr,
        gateway: Option<Ipv4Addr>,
    ) -> Self {
        self.bind_slot(node, vlan, address, gateway, Some(slot))
    }

    fn bind_slot(
        mut self,
        node: impl Into<String>,
        vlan: u16,
        address: Ipv4Addr,
        gateway: Option<Ipv4Addr>,
        slot: Option<u16>,
    ) -> Self {
        self.bindings.push(BindingDecl {
            node: node.into(),
            vlan,
            address,
            gateway,
            slot,
        });
        self
    }

    pub fn link(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.links.push(LinkDecl {
            a: a.into(),
            b: b.into(),
            trunk: None,
        });
        self
    }

    /// Declares a link with an explicit trunk allow-list.
    pub fn trunk_link<I>(mut self, a: impl Into<String>, b: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.links.push(LinkDecl {
            a: a.into(),
            b: b.into(),
            trunk: Some(allowed.into_iter().collect()),
        });
        self
    }

    /// Validates the description and produces an immutable [`Topology`].
    pub fn build(self) -> Result<Topology, TopologyValidationError> {
        let mut topology = Topology {
            name: self.name,
            nodes: Vec::with_capacity(self.nodes.len()),
            index: HashMap::with_capacity(self.nodes.len()),
            links: Vec::with_capacity(self.links.len()),
            vlans: BTreeMap::new(),
            bindings: Vec::with_capacity(self.bindings.len()),
            served: BTreeMap::new(),
            trunks: Vec::new(),
        };

        for (name, role) in self.nodes {
            validate_node_name(&name)?;
            if role == NodeRole::Switch {
                // The bridge itself is a kernel device named after the switch.
                IfName::new(name.as_str())?;
            }
            if topology.index.contains_key(&name) {
                return Err(TopologyValidationError::DuplicateNode(name));
            }
            topology.index.insert(name.clone(), topology.nodes.len());
            topology.nodes.push(Node {
                name,
                role,
                links: Vec::new(),
            });
        }

        for decl in &self.vlans {
            let assignment = validate_vlan(decl)?;
            if topology.vlans.contains_key(&assignment.id) {
                return Err(TopologyValidationError::DuplicateVlan(assignment.id));
            }
            if let Some(other) = topology
                .vlans
                .values()
                .find(|v| v.subnet.overlaps(&assignment.subnet))
            {
                return Err(TopologyValidationError::VlanOverlap {
                    a: other.id,
                    a_subnet: other.subnet,
                    b: assignment.id,
                    b_subnet: assignment.subnet,
                });
            }
            topology.vlans.insert(assignment.id, assignment);
        }

        let mut next_slot: HashMap<String, u32> = HashMap::new();
        for decl in self.links {
            add_link(&mut topology, &mut next_slot, decl)?;
        }

        for (node, vlans) in self.serves {
            add_served(&mut topology, &node, &vlans)?;
        }

        for decl in self.bindings {
            add_binding(&mut topology, decl)?;
        }

        check_unique_addresses(&topology)?;

        Ok(topology)
    }
}

fn validate_node_name(name: &str) -> Result<(), TopologyValidationError> {
    let reason = if name.is_empty() {
        Some("name is empty".to_string())
    } else {
        name.chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
            .map(|c| format!("invalid character {:?}", c))
    };

    match reason {
        Some(reason) => Err(TopologyValidationError::InvalidNodeName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn validate_vlan(decl: &VlanDecl) -> Result<VlanAssignment, TopologyValidationError> {
    let id = VlanId::new(decl.id).map_err(|_| TopologyValidationError::InvalidVlanId(decl.id))?;
    let subnet = Ipv4Prefix::new(decl.network, decl.prefix_len).map_err(|e| {
        TopologyValidationError::InvalidSubnet {
            vlan: decl.id,
            reason: e.to_string(),
        }
    })?;
    if !subnet.is_host_address(decl.gateway) {
        return Err(TopologyValidationError::GatewayOutsideSubnet {
            vlan: id,
            gateway: decl.gateway,
            subnet,
        });
    }
    Ok(VlanAssignment {
        id,
        subnet,
        gateway: decl.gateway,
    })
}

fn add_link(
    topology: &mut Topology,
    next_slot: &mut HashMap<String, u32>,
    decl: LinkDecl,
) -> Result<(), TopologyValidationError> {
    for name in [&decl.a, &decl.b] {
        if topology.node(name).is_none() {
            return Err(TopologyValidationError::UnknownEndpoint {
                a: decl.a.clone(),
                b: decl.b.clone(),
                missing: name.clone(),
            });
        }
    }
    if decl.a == decl.b {
        return Err(TopologyValidationError::SelfLoop(decl.a));
    }

    let id = topology.links.len();
    let mut endpoint = |name: &str| -> Result<Endpoint, TopologyValidationError> {
        let first = topology.nodes[topology.index[name]].role.first_slot();
        let next = next_slot
            .entry(name.to_string())
            .or_insert_with(|| u32::from(first));
        let slot = u16::try_from(*next).map_err(|_| TopologyValidationError::TooManyLinks {
            node: name.to_string(),
        })?;
        *next += 1;
        Ok(Endpoint {
            node: name.to_string(),
            slot,
            ifname: IfName::new(format!("{}-eth{}", name, slot))?,
        })
    };
    let endpoints = [endpoint(&decl.a)?, endpoint(&decl.b)?];

    let link = Link { id, endpoints };
    let inter_switch = topology.is_inter_switch(&link);

    match decl.trunk {
        Some(_) if !inter_switch => {
            return Err(TopologyValidationError::TrunkOnNonSwitchLink {
                a: decl.a,
                b: decl.b,
            });
        }
        Some(list) => {
            if list.is_empty() {
                return Err(TopologyValidationError::EmptyTrunk {
                    a: decl.a,
                    b: decl.b,
                });
            }
            let mut allowed = BTreeSet::new();
            for raw in list {
                let vlan = VlanId::new(raw)
                    .ok()
                    .filter(|v| topology.vlans.contains_key(v))
                    .ok_or_else(|| TopologyValidationError::TrunkVlanUndeclared {
                        a: decl.a.clone(),
                        b: decl.b.clone(),
                        vlan: raw,
                    })?;
                allowed.insert(vlan);
            }
            topology.trunks.push(TrunkPolicy {
                link: id,
                allowed,
                explicit: true,
            });
        }
        None if inter_switch && !topology.vlans.is_empty() => {
            topology.trunks.push(TrunkPolicy {
                link: id,
                allowed: topology.vlans.keys().copied().collect(),
                explicit: false,
            });
        }
        None => {}
    }

    for end in &link.endpoints {
        let idx = topology.index[&end.node];
        topology.nodes[idx].links.push(id);
    }
    topology.links.push(link);
    Ok(())
}

fn lookup_vlan(
    topology: &Topology,
    node: &str,
    raw: u16,
) -> Result<VlanAssignment, TopologyValidationError> {
    VlanId::new(raw)
        .ok()
        .and_then(|id| topology.vlans.get(&id).copied())
        .ok_or_else(|| TopologyValidationError::UnknownVlan {
            node: node.to_string(),
            vlan: raw,
        })
}

fn add_served(
    topology: &mut Topology,
    node: &str,
    vlans: &[u16],
) -> Result<(), TopologyValidationError> {
    let role = topology
        .node(node)
        .map(Node::role)
        .ok_or_else(|| TopologyValidationError::UnknownNode(node.to_string()))?;
    if role != NodeRole::Router {
        return Err(TopologyValidationError::ServesOnNonRouter {
            node: node.to_string(),
            role,
        });
    }

    let mut served = BTreeSet::new();
    for &raw in vlans {
        let vlan = lookup_vlan(topology, node, raw)?;
        let base = topology
            .base_interface(node)
            .ok_or_else(|| TopologyValidationError::NoInterface {
                node: node.to_string(),
                slot: role.first_slot(),
            })?;
        base.ifname.vlan_subinterface(vlan.id)?;
        served.insert(vlan.id);
    }

    topology
        .served
        .entry(node.to_string())
        .or_default()
        .extend(served);
    Ok(())
}

fn add_binding(topology: &mut Topology, decl: BindingDecl) -> Result<(), TopologyValidationError> {
    let role = topology
        .node(&decl.node)
        .map(Node::role)
        .ok_or_else(|| TopologyValidationError::UnknownNode(decl.node.clone()))?;
    if !role.can_bind_vlan() {
        return Err(TopologyValidationError::BindingNotSupported {
            node: decl.node,
            role,
        });
    }

    let vlan = lookup_vlan(topology, &decl.node, decl.vlan)?;
    let slot = decl.slot.unwrap_or_else(|| role.first_slot());
    let iface = topology
        .interface(&decl.node, slot)
        .ok_or_else(|| TopologyValidationError::NoInterface {
            node: decl.node.clone(),
            slot,
        })?;
    iface.ifname.vlan_subinterface(vlan.id)?;

    if !vlan.subnet.contains(decl.address) {
        return Err(TopologyValidationError::AddressOutsideSubnet {
            node: decl.node,
            vlan: vlan.id,
            address: decl.address,
            subnet: vlan.subnet,
        });
    }
    if !vlan.subnet.is_host_address(decl.address) {
        return Err(TopologyValidationError::ReservedAddress {
            node: decl.node,
            address: decl.address,
            subnet: vlan.subnet,
        });
    }

    if let Some(gateway) = decl.gateway {
        if !vlan.subnet.contains(gateway) {
            return Err(TopologyValidationError::BindingGatewayOutsideSubnet {
                node: decl.node,
                vlan: vlan.id,
                gateway,
                subnet: vlan.subnet,
            });
        }
        if topology
            .bindings_for(&decl.node)
            .any(|b| b.gateway.is_some())
        {
            return Err(TopologyValidationError::MultipleGateways(decl.node));
        }
    }

    let served_on_slot = slot == role.first_slot()
        && topology.router_vlans(&decl.node).any(|v| v == vlan.id);
    let bound_on_slot = topology
        .bindings_for(&decl.node)
        .any(|b| b.slot == slot && b.vlan == vlan.id);
    if served_on_slot || bound_on_slot {
        return Err(TopologyValidationError::DuplicateBinding {
            node: decl.node,
            vlan: vlan.id,
            slot,
        });
    }

    topology.bindings.push(HostBinding {
        node: decl.node,
        vlan: vlan.id,
        address: decl.address,
        gateway: decl.gateway,
        slot,
    });
    Ok(())
}

fn check_unique_addresses(topology: &Topology) -> Result<(), TopologyValidationError> {
    let mut seen = HashSet::new();
    let served = topology.served.values().flat_map(|vlans| {
        vlans
            .iter()
            .filter_map(|id| topology.vlans.get(id))
            .map(|v| v.gateway)
    });
    let bound = topology.bindings.iter().map(|b| b.address);

    for address in served.chain(bound) {
        if !seen.insert(address) {
            return Err(TopologyValidationError::DuplicateAddress { address });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn two_vlan_builder() -> TopologyBuilder {
        TopologyBuilder::new("test")
            .vlan(10, ip("10.0.10.0"), 24, ip("10.0.10.1"))
            .vlan(20, ip("10.0.20.0"), 24, ip("10.0.20.1"))
    }

    #[test]
    fn test_slot_numbering() {
        let topo = two_vlan_builder()
            .host("h1")
            .host("h2")
            .switch("s1")
            .switch("s2")
            .link("h1", "s1")
            .link("h2", "s2")
            .link("s1", "s2")
            .build()
            .unwrap();

        assert_eq!(topo.interface("h1", 0).unwrap().ifname.as_str(), "h1-eth0");
        assert_eq!(topo.base_interface("s1").unwrap().ifname.as_str(), "s1-eth1");
        assert_eq!(topo.interface("s1", 2).unwrap().ifname.as_str(), "s1-eth2");
        assert_eq!(topo.neighbors("s1"), vec!["h1", "s2"]);
        assert!(topo.neighbors("nope").is_empty());

        let link = &topo.links()[2];
        assert!(topo.is_inter_switch(link));
        assert_eq!(link.other_end("s1").unwrap().node, "s2");
        assert_eq!(topo.interface_name(&link.endpoints()[1]).as_str(), "s2-eth2");
    }

    #[test]
    fn test_default_trunk_policy() {
        let topo = two_vlan_builder()
            .switch("s1")
            .switch("s2")
            .link("s1", "s2")
            .build()
            .unwrap();

        let trunks = topo.trunk_policies();
        assert_eq!(trunks.len(), 1);
        assert!(!trunks[0].explicit);
        assert_eq!(
            trunks[0].allowed.iter().map(|v| v.as_u16()).collect::<Vec<_>>(),
            vec![10, 20]
        );
    }

    #[test]
    fn test_explicit_trunk_policy() {
        let topo = two_vlan_builder()
            .switch("s1")
            .switch("s2")
            .trunk_link("s1", "s2", [20])
            .build()
            .unwrap();
        assert!(topo.trunk_policies()[0].explicit);
        assert_eq!(topo.trunk_policies()[0].allowed.len(), 1);
    }

    #[test]
    fn test_trunk_errors() {
        let err = two_vlan_builder()
            .host("h1")
            .switch("s1")
            .trunk_link("h1", "s1", [10])
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyValidationError::TrunkOnNonSwitchLink { .. }));

        let err = two_vlan_builder()
            .switch("s1")
            .switch("s2")
            .trunk_link("s1", "s2", [])
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyValidationError::EmptyTrunk { .. }));

        let err = two_vlan_builder()
            .switch("s1")
            .switch("s2")
            .trunk_link("s1", "s2", [10, 30])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            TopologyValidationError::TrunkVlanUndeclared {
                a: "s1".to_string(),
                b: "s2".to_string(),
                vlan: 30
            }
        );
    }

    #[test]
    fn test_duplicate_and_invalid_nodes() {
        let err = TopologyBuilder::new("t").host("h1").switch("h1").build().unwrap_err();
        assert_eq!(err, TopologyValidationError::DuplicateNode("h1".to_string()));

        let err = TopologyBuilder::new("t").host("h-1").build().unwrap_err();
        assert!(matches!(err, TopologyValidationError::InvalidNodeName { .. }));

        let err = TopologyBuilder::new("t").host("").build().unwrap_err();
        assert!(matches!(err, TopologyValidationError::InvalidNodeName { .. }));
    }

    #[test]
    fn test_link_errors() {
        let err = TopologyBuilder::new("t")
            .host("h1")
            .link("h1", "s9")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            TopologyValidationError::UnknownEndpoint { ref missing, .. } if missing == "s9"
        ));

        let err = TopologyBuilder::new("t")
            .switch("s1")
            .link("s1", "s1")
            .build()
            .unwrap_err();
        assert_eq!(err, TopologyValidationError::SelfLoop("s1".to_string()));
    }

    #[test]
    fn test_interface_name_too_long() {
        let err = TopologyBuilder::new("t")
            .host("averyverylonghost")
            .switch("s1")
            .link("averyverylonghost", "s1")
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyValidationError::InterfaceName(_)));

        // Base name fits, sub-interface does not.
        let err = TopologyBuilder::new("t")
            .vlan(4000, ip("10.0.0.0"), 24, ip("10.0.0.1"))
            .host("hostname1")
            .switch("s1")
            .link("hostname1", "s1")
            .bind("hostname1", 4000, ip("10.0.0.2"), None)
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyValidationError::InterfaceName(_)));
    }

    #[test]
    fn test_switch_name_too_long() {
        let err = TopologyBuilder::new("t")
            .switch("core_switch_0001")
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyValidationError::InterfaceName(_)));

        assert!(TopologyBuilder::new("t").switch("core_switch_001").build().is_ok());
    }

    #[test]
    fn test_slot_exhaustion() {
        // Switch slots start at 1, so 65535 links use every slot.
        let links = |n: usize| {
            (0..n).fold(TopologyBuilder::new("t").switch("a").switch("b"), |b, _| {
                b.link("a", "b")
            })
        };

        let topology = links(65_535).build().unwrap();
        let last = topology.links().last().unwrap();
        assert_eq!(last.endpoints()[0].ifname.as_str(), "a-eth65535");

        let err = links(65_536).build().unwrap_err();
        assert_eq!(
            err,
            TopologyValidationError::TooManyLinks {
                node: "a".to_string()
            }
        );
    }

    #[test]
    fn test_vlan_errors() {
        let err = TopologyBuilder::new("t")
            .vlan(0, ip("10.0.0.0"), 24, ip("10.0.0.1"))
            .build()
            .unwrap_err();
        assert_eq!(err, TopologyValidationError::InvalidVlanId(0));

        let err = two_vlan_builder()
            .vlan(10, ip("10.0.30.0"), 24, ip("10.0.30.1"))
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyValidationError::DuplicateVlan(_)));

        let err = two_vlan_builder()
            .vlan(30, ip("10.0.0.0"), 16, ip("10.0.0.1"))
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyValidationError::VlanOverlap { .. }));

        let err = TopologyBuilder::new("t")
            .vlan(10, ip("10.0.10.1"), 24, ip("10.0.10.1"))
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyValidationError::InvalidSubnet { vlan: 10, .. }));

        let err = TopologyBuilder::new("t")
            .vlan(10, ip("10.0.10.0"), 24, ip("10.0.11.1"))
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyValidationError::GatewayOutsideSubnet { .. }));
    }

    fn host_on_switch() -> TopologyBuilder {
        two_vlan_builder().host("h1").switch("s1").link("h1", "s1")
    }

    #[test]
    fn test_binding_errors() {
        let err = host_on_switch()
            .bind("h1", 30, ip("10.0.30.2"), None)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            TopologyValidationError::UnknownVlan {
                node: "h1".to_string(),
                vlan: 30
            }
        );

        let err = host_on_switch()
            .bind("h1", 10, ip("10.0.20.2"), None)
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyValidationError::AddressOutsideSubnet { .. }));

        let err = host_on_switch()
            .bind("h1", 10, ip("10.0.10.255"), None)
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyValidationError::ReservedAddress { .. }));

        let err = host_on_switch()
            .bind("h1", 10, ip("10.0.10.2"), Some(ip("10.0.20.1")))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            TopologyValidationError::BindingGatewayOutsideSubnet { .. }
        ));

        let err = host_on_switch()
            .bind("s1", 10, ip("10.0.10.2"), None)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            TopologyValidationError::BindingNotSupported {
                role: NodeRole::Switch,
                ..
            }
        ));

        let err = host_on_switch()
            .bind("h1", 10, ip("10.0.10.2"), None)
            .bind("h1", 10, ip("10.0.10.3"), None)
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyValidationError::DuplicateBinding { slot: 0, .. }));

        let err = host_on_switch()
            .bind("h1", 10, ip("10.0.10.2"), Some(ip("10.0.10.1")))
            .bind("h1", 20, ip("10.0.20.2"), Some(ip("10.0.20.1")))
            .build()
            .unwrap_err();
        assert_eq!(err, TopologyValidationError::MultipleGateways("h1".to_string()));

        let err = host_on_switch()
            .bind_on_slot("h1", 1, 10, ip("10.0.10.2"), None)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            TopologyValidationError::NoInterface {
                node: "h1".to_string(),
                slot: 1
            }
        );

        let err = host_on_switch()
            .bind("h9", 10, ip("10.0.10.2"), None)
            .build()
            .unwrap_err();
        assert_eq!(err, TopologyValidationError::UnknownNode("h9".to_string()));
    }

    #[test]
    fn test_multi_vlan_binding() {
        let topo = host_on_switch()
            .bind("h1", 10, ip("10.0.10.2"), Some(ip("10.0.10.1")))
            .bind("h1", 20, ip("10.0.20.2"), None)
            .build()
            .unwrap();
        assert_eq!(topo.bindings_for("h1").count(), 2);
    }

    #[test]
    fn test_router_service() {
        let topo = two_vlan_builder()
            .router("r1", [10, 20])
            .switch("s1")
            .link("r1", "s1")
            .build()
            .unwrap();
        assert_eq!(
            topo.router_vlans("r1").map(|v| v.as_u16()).collect::<Vec<_>>(),
            vec![10, 20]
        );
        assert_eq!(topo.router_vlans("s1").count(), 0);

        let err = two_vlan_builder()
            .router("r1", [10])
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyValidationError::NoInterface { .. }));

        let err = two_vlan_builder()
            .host("h1")
            .serve("h1", [10])
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyValidationError::ServesOnNonRouter { .. }));

        let err = two_vlan_builder()
            .router("r1", [10])
            .switch("s1")
            .link("r1", "s1")
            .bind("r1", 10, ip("10.0.10.5"), None)
            .build()
            .unwrap_err();
        assert!(matches!(err, TopologyValidationError::DuplicateBinding { .. }));
    }

    #[test]
    fn test_duplicate_address() {
        let err = two_vlan_builder()
            .router("r1", [10])
            .host("h1")
            .switch("s1")
            .link("r1", "s1")
            .link("h1", "s1")
            .bind("h1", 10, ip("10.0.10.1"), None)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            TopologyValidationError::DuplicateAddress {
                address: ip("10.0.10.1")
            }
        );
    }

    #[test]
    fn test_role_capabilities() {
        assert!(NodeRole::Host.is_namespaced());
        assert!(!NodeRole::Switch.is_namespaced());
        assert!(NodeRole::Router.can_forward());
        assert!(!NodeRole::Host.can_forward());
        assert!(!NodeRole::Switch.can_bind_vlan());
        assert_eq!(NodeRole::Switch.first_slot(), 1);
        assert_eq!(NodeRole::Router.to_string(), "router");
    }
}
