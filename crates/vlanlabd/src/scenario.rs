//! Built-in reference scenario: inter-VLAN routing across two switches.
//!
//! ```text
//!   h1 h2 h3            h4 h5 h6
//!    \ | /               \ | /
//!     s1 ==== trunk ===== s2 --- r1
//!           10,20,30
//! ```
//!
//! Three /26 VLANs carved from 172.16.1.0/24; r1 owns every gateway and
//! routes between them.

use std::net::Ipv4Addr;

use crate::error::TopologyValidationError;
use crate::topology::{Topology, TopologyBuilder};

/// Name of the reference topology.
pub const REFERENCE_NAME: &str = "multi-switch-vlan";

/// Prefix length of every reference VLAN (255.255.255.192).
pub const REFERENCE_PREFIX_LEN: u8 = 26;

/// (VLAN, network, gateway)
const REFERENCE_VLANS: [(u16, Ipv4Addr, Ipv4Addr); 3] = [
    (10, Ipv4Addr::new(172, 16, 1, 0), Ipv4Addr::new(172, 16, 1, 1)),
    (20, Ipv4Addr::new(172, 16, 1, 64), Ipv4Addr::new(172, 16, 1, 65)),
    (30, Ipv4Addr::new(172, 16, 1, 128), Ipv4Addr::new(172, 16, 1, 129)),
];

/// (host, VLAN, address, switch)
const REFERENCE_HOSTS: [(&str, u16, Ipv4Addr, &str); 6] = [
    ("h1", 10, Ipv4Addr::new(172, 16, 1, 2), "s1"),
    ("h2", 20, Ipv4Addr::new(172, 16, 1, 66), "s1"),
    ("h3", 30, Ipv4Addr::new(172, 16, 1, 130), "s1"),
    ("h4", 10, Ipv4Addr::new(172, 16, 1, 3), "s2"),
    ("h5", 20, Ipv4Addr::new(172, 16, 1, 67), "s2"),
    ("h6", 30, Ipv4Addr::new(172, 16, 1, 131), "s2"),
];

/// Builder for the reference topology, for callers that want to extend it.
pub fn reference_builder() -> TopologyBuilder {
    let mut builder = TopologyBuilder::new(REFERENCE_NAME);

    for (id, network, gateway) in REFERENCE_VLANS {
        builder = builder.vlan(id, network, REFERENCE_PREFIX_LEN, gateway);
    }

    builder = builder.switch("s1").switch("s2");

    for (host, vlan, address, _) in REFERENCE_HOSTS {
        let gateway = REFERENCE_VLANS
            .iter()
            .find(|(id, _, _)| *id == vlan)
            .map(|(_, _, gw)| *gw);
        builder = builder.host(host).bind(host, vlan, address, gateway);
    }
    for (host, _, _, switch) in REFERENCE_HOSTS {
        builder = builder.link(host, switch);
    }

    builder
        .trunk_link("s1", "s2", REFERENCE_VLANS.map(|(id, _, _)| id))
        .router("r1", REFERENCE_VLANS.map(|(id, _, _)| id))
        .link("s2", "r1")
}

/// The validated reference topology.
pub fn reference_topology() -> Result<Topology, TopologyValidationError> {
    reference_builder().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reference_builds() {
        let topo = reference_topology().unwrap();
        assert_eq!(topo.nodes().len(), 9);
        assert_eq!(topo.links().len(), 8);
        assert_eq!(topo.bindings().len(), 6);
        assert_eq!(topo.neighbors("s2"), vec!["h4", "h5", "h6", "s1", "r1"]);
    }

    #[test]
    fn test_reference_ports() {
        let topo = reference_topology().unwrap();
        let trunk = &topo.trunk_policies()[0];
        let link = topo.link(trunk.link).unwrap();
        let names: Vec<&str> = link.endpoints().iter().map(|e| e.ifname.as_str()).collect();
        assert_eq!(names, vec!["s1-eth4", "s2-eth4"]);
        assert!(trunk.explicit);

        assert_eq!(topo.base_interface("r1").unwrap().ifname.as_str(), "r1-eth0");
        assert_eq!(topo.interface("s2", 5).unwrap().node, "s2");
    }

    #[test]
    fn test_reference_netmask() {
        let topo = reference_topology().unwrap();
        for vlan in topo.vlans() {
            assert_eq!(vlan.netmask(), Ipv4Addr::new(255, 255, 255, 192));
        }
    }
}
