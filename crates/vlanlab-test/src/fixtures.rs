//! Test fixtures for common topology patterns
//!
//! Provides reusable topologies for provisioning and teardown tests

use std::net::Ipv4Addr;
use vlanlabd::{reference_topology, Topology, TopologyBuilder};

/// Parses a dotted-quad address.
pub fn ip(s: &str) -> Ipv4Addr {
    s.parse().expect("invalid IPv4 address in fixture")
}

/// The built-in two-switch, three-VLAN reference topology.
pub fn reference() -> Topology {
    reference_topology().expect("reference topology must validate")
}

/// Small topologies built from scratch
pub mod topology_fixtures {
    use super::*;

    /// Two hosts on one switch in VLAN 10, no router.
    pub fn single_switch_pair() -> TopologyBuilder {
        TopologyBuilder::new("pair")
            .vlan(10, ip("10.0.10.0"), 24, ip("10.0.10.1"))
            .switch("s1")
            .host("h1")
            .host("h2")
            .bind("h1", 10, ip("10.0.10.2"), None)
            .bind("h2", 10, ip("10.0.10.3"), None)
            .link("h1", "s1")
            .link("h2", "s1")
    }

    /// One host per VLAN on a single switch, routed by r1.
    pub fn routed_star(vlans: &[u16]) -> TopologyBuilder {
        let mut builder = TopologyBuilder::new("star").switch("s1");
        for &vlan in vlans {
            let (hi, lo) = ((vlan >> 8) as u8, (vlan & 0xff) as u8);
            let gateway = Ipv4Addr::new(10, hi, lo, 1);
            let host = format!("h{}", vlan);
            builder = builder
                .vlan(vlan, Ipv4Addr::new(10, hi, lo, 0), 24, gateway)
                .host(host.clone())
                .bind(host.clone(), vlan, Ipv4Addr::new(10, hi, lo, 2), Some(gateway))
                .link(host, "s1");
        }
        builder
            .router("r1", vlans.iter().copied())
            .link("r1", "s1")
    }

    /// Two switches joined by a link, optionally with an explicit trunk list.
    pub fn two_switch_trunk(allowed: Option<Vec<u16>>) -> TopologyBuilder {
        let builder = TopologyBuilder::new("trunk")
            .vlan(10, ip("10.0.10.0"), 24, ip("10.0.10.1"))
            .vlan(20, ip("10.0.20.0"), 24, ip("10.0.20.1"))
            .switch("s1")
            .switch("s2");
        match allowed {
            Some(vlans) => builder.trunk_link("s1", "s2", vlans),
            None => builder.link("s1", "s2"),
        }
    }
}

/// Topologies that must fail validation
pub mod invalid_fixtures {
    use super::*;

    /// A host bound to VLAN 99, which is never declared.
    pub fn unknown_vlan() -> TopologyBuilder {
        topology_fixtures::single_switch_pair()
            .host("h3")
            .link("h3", "s1")
            .bind("h3", 99, ip("10.0.99.2"), None)
    }

    /// Two nodes named `h1`.
    pub fn duplicate_node() -> TopologyBuilder {
        topology_fixtures::single_switch_pair().host("h1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_validate() {
        assert!(topology_fixtures::single_switch_pair().build().is_ok());
        assert!(topology_fixtures::routed_star(&[10, 20, 300]).build().is_ok());
        assert!(topology_fixtures::two_switch_trunk(None).build().is_ok());
        assert!(topology_fixtures::two_switch_trunk(Some(vec![20])).build().is_ok());
        assert!(invalid_fixtures::unknown_vlan().build().is_err());
        assert!(invalid_fixtures::duplicate_node().build().is_err());
    }
}
