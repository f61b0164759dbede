//! Kernel command builders for topology primitives.
//!
//! Each builder returns a typed [`ShellCommand`]; nothing here executes.

use std::net::Ipv4Addr;
use vlanlab_common::shell::{ShellCommand, SYSCTL_CMD};
use vlanlab_types::VlanId;

/// Loopback device name inside a namespace.
pub const LOOPBACK_DEV: &str = "lo";

/// sysctl key controlling IPv4 forwarding.
pub const IP_FORWARD_KEY: &str = "net.ipv4.ip_forward";

/// Build namespace creation command
pub fn build_netns_add_cmd(netns: &str) -> ShellCommand {
    ShellCommand::ip().args(["netns", "add", netns])
}

/// Build loopback bring-up command for a namespace
pub fn build_netns_loopback_up_cmd(netns: &str) -> ShellCommand {
    build_link_up_cmd(Some(netns), LOOPBACK_DEV)
}

/// Build namespace deletion command
pub fn build_netns_del_cmd(netns: &str) -> ShellCommand {
    ShellCommand::ip().args(["netns", "del", netns])
}

/// Build virtual switch creation command
pub fn build_add_bridge_cmd(switch: &str) -> ShellCommand {
    ShellCommand::ovs_vsctl().args(["add-br", switch])
}

/// Build virtual switch deletion command
pub fn build_del_bridge_cmd(switch: &str) -> ShellCommand {
    ShellCommand::ovs_vsctl().args(["--if-exists", "del-br", switch])
}

/// Build link admin-up command, in `netns` or the root namespace
pub fn build_link_up_cmd(netns: Option<&str>, dev: &str) -> ShellCommand {
    ShellCommand::ip_in(netns).args(["link", "set", dev, "up"])
}

/// Build veth pair creation command
///
/// Each end is moved into its namespace at creation time; an end without a
/// namespace stays in the root namespace (switch ports).
pub fn build_add_veth_cmd(
    a: &str,
    a_netns: Option<&str>,
    b: &str,
    b_netns: Option<&str>,
) -> ShellCommand {
    let mut cmd = ShellCommand::ip().args(["link", "add", a]);
    if let Some(ns) = a_netns {
        cmd = cmd.args(["netns", ns]);
    }
    cmd = cmd.args(["type", "veth", "peer", "name", b]);
    if let Some(ns) = b_netns {
        cmd = cmd.args(["netns", ns]);
    }
    cmd
}

/// Build link deletion command (removes both ends of a veth pair)
pub fn build_del_link_cmd(netns: Option<&str>, dev: &str) -> ShellCommand {
    ShellCommand::ip_in(netns).args(["link", "del", dev])
}

/// Build switch port attach command
pub fn build_add_port_cmd(switch: &str, port: &str) -> ShellCommand {
    ShellCommand::ovs_vsctl().args(["add-port", switch, port])
}

/// Build switch port detach command
pub fn build_del_port_cmd(switch: &str, port: &str) -> ShellCommand {
    ShellCommand::ovs_vsctl().args(["--if-exists", "del-port", switch, port])
}

/// Build address flush command
pub fn build_flush_addr_cmd(netns: &str, dev: &str) -> ShellCommand {
    ShellCommand::ip_netns(netns).args(["addr", "flush", "dev", dev])
}

/// Build VLAN sub-interface creation command
pub fn build_add_vlan_subintf_cmd(
    netns: &str,
    parent: &str,
    name: &str,
    vlan: VlanId,
) -> ShellCommand {
    ShellCommand::ip_netns(netns).args([
        "link".to_string(),
        "add".to_string(),
        "link".to_string(),
        parent.to_string(),
        "name".to_string(),
        name.to_string(),
        "type".to_string(),
        "vlan".to_string(),
        "id".to_string(),
        vlan.to_string(),
    ])
}

/// Build address assignment command
pub fn build_add_addr_cmd(netns: &str, dev: &str, address: Ipv4Addr, prefix_len: u8) -> ShellCommand {
    ShellCommand::ip_netns(netns).args([
        "addr".to_string(),
        "add".to_string(),
        format!("{}/{}", address, prefix_len),
        "brd".to_string(),
        "+".to_string(),
        "dev".to_string(),
        dev.to_string(),
    ])
}

/// Build address removal command
pub fn build_del_addr_cmd(netns: &str, dev: &str, address: Ipv4Addr, prefix_len: u8) -> ShellCommand {
    ShellCommand::ip_netns(netns).args([
        "addr".to_string(),
        "del".to_string(),
        format!("{}/{}", address, prefix_len),
        "dev".to_string(),
        dev.to_string(),
    ])
}

/// Build IPv4 forwarding toggle command
pub fn build_set_forwarding_cmd(netns: &str, enabled: bool) -> ShellCommand {
    let value = if enabled { 1 } else { 0 };
    ShellCommand::netns_exec(netns, SYSCTL_CMD)
        .arg("-w")
        .arg(format!("{}={}", IP_FORWARD_KEY, value))
}

/// Build trunk mode command for a switch port
pub fn build_set_trunk_cmd<'a, I>(port: &str, vlans: I) -> ShellCommand
where
    I: IntoIterator<Item = &'a VlanId>,
{
    ShellCommand::ovs_vsctl()
        .args(["set", "port", port, "vlan_mode=trunk"])
        .arg(format!("trunk={}", VlanId::join(vlans)))
}

/// Build trunk mode removal command for a switch port
pub fn build_clear_trunk_cmd(port: &str) -> ShellCommand {
    ShellCommand::ovs_vsctl().args(["--if-exists", "clear", "port", port, "vlan_mode", "trunk"])
}

/// Build default route creation command
pub fn build_add_default_route_cmd(netns: &str, gateway: Ipv4Addr, dev: &str) -> ShellCommand {
    ShellCommand::ip_netns(netns)
        .args(["route", "add", "default", "via"])
        .arg(gateway.to_string())
        .args(["dev", dev])
}

/// Build default route removal command
pub fn build_del_default_route_cmd(netns: &str, gateway: Ipv4Addr, dev: &str) -> ShellCommand {
    ShellCommand::ip_netns(netns)
        .args(["route", "del", "default", "via"])
        .arg(gateway.to_string())
        .args(["dev", dev])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vlan(id: u16) -> VlanId {
        VlanId::new(id).unwrap()
    }

    #[test]
    fn test_build_netns_cmds() {
        assert_eq!(build_netns_add_cmd("h1").to_string(), "/sbin/ip netns add h1");
        assert_eq!(
            build_netns_loopback_up_cmd("h1").to_string(),
            "/sbin/ip -n h1 link set lo up"
        );
        assert_eq!(build_netns_del_cmd("h1").to_string(), "/sbin/ip netns del h1");
    }

    #[test]
    fn test_build_bridge_cmds() {
        assert_eq!(build_add_bridge_cmd("s1").to_string(), "/usr/bin/ovs-vsctl add-br s1");
        assert_eq!(
            build_del_bridge_cmd("s1").to_string(),
            "/usr/bin/ovs-vsctl --if-exists del-br s1"
        );
        assert_eq!(build_link_up_cmd(None, "s1").to_string(), "/sbin/ip link set s1 up");
    }

    #[test]
    fn test_build_add_veth_cmd() {
        assert_eq!(
            build_add_veth_cmd("h1-eth0", Some("h1"), "s1-eth1", None).to_string(),
            "/sbin/ip link add h1-eth0 netns h1 type veth peer name s1-eth1"
        );
        assert_eq!(
            build_add_veth_cmd("s1-eth4", None, "s2-eth4", None).to_string(),
            "/sbin/ip link add s1-eth4 type veth peer name s2-eth4"
        );
        assert_eq!(
            build_add_veth_cmd("h1-eth0", Some("h1"), "r1-eth0", Some("r1")).to_string(),
            "/sbin/ip link add h1-eth0 netns h1 type veth peer name r1-eth0 netns r1"
        );
    }

    #[test]
    fn test_build_port_cmds() {
        assert_eq!(
            build_add_port_cmd("s1", "s1-eth1").to_string(),
            "/usr/bin/ovs-vsctl add-port s1 s1-eth1"
        );
        assert_eq!(
            build_del_port_cmd("s1", "s1-eth1").to_string(),
            "/usr/bin/ovs-vsctl --if-exists del-port s1 s1-eth1"
        );
        assert_eq!(
            build_del_link_cmd(Some("h1"), "h1-eth0").to_string(),
            "/sbin/ip -n h1 link del h1-eth0"
        );
    }

    #[test]
    fn test_build_vlan_subintf_cmds() {
        assert_eq!(
            build_flush_addr_cmd("h1", "h1-eth0").to_string(),
            "/sbin/ip -n h1 addr flush dev h1-eth0"
        );
        assert_eq!(
            build_add_vlan_subintf_cmd("h1", "h1-eth0", "h1-eth0.10", vlan(10)).to_string(),
            "/sbin/ip -n h1 link add link h1-eth0 name h1-eth0.10 type vlan id 10"
        );
    }

    #[test]
    fn test_build_addr_cmds() {
        let addr: Ipv4Addr = "172.16.1.2".parse().unwrap();
        assert_eq!(
            build_add_addr_cmd("h1", "h1-eth0.10", addr, 26).to_string(),
            "/sbin/ip -n h1 addr add 172.16.1.2/26 brd + dev h1-eth0.10"
        );
        assert_eq!(
            build_del_addr_cmd("h1", "h1-eth0.10", addr, 26).to_string(),
            "/sbin/ip -n h1 addr del 172.16.1.2/26 dev h1-eth0.10"
        );
    }

    #[test]
    fn test_build_set_forwarding_cmd() {
        assert_eq!(
            build_set_forwarding_cmd("r1", true).to_string(),
            "/sbin/ip netns exec r1 /sbin/sysctl -w net.ipv4.ip_forward=1"
        );
        assert_eq!(
            build_set_forwarding_cmd("r1", false).to_string(),
            "/sbin/ip netns exec r1 /sbin/sysctl -w net.ipv4.ip_forward=0"
        );
    }

    #[test]
    fn test_build_trunk_cmds() {
        let vlans = [vlan(10), vlan(20), vlan(30)];
        assert_eq!(
            build_set_trunk_cmd("s1-eth4", &vlans).to_string(),
            "/usr/bin/ovs-vsctl set port s1-eth4 vlan_mode=trunk trunk=10,20,30"
        );
        assert_eq!(
            build_clear_trunk_cmd("s1-eth4").to_string(),
            "/usr/bin/ovs-vsctl --if-exists clear port s1-eth4 vlan_mode trunk"
        );
    }

    #[test]
    fn test_build_route_cmds() {
        let gw: Ipv4Addr = "172.16.1.1".parse().unwrap();
        assert_eq!(
            build_add_default_route_cmd("h1", gw, "h1-eth0.10").to_string(),
            "/sbin/ip -n h1 route add default via 172.16.1.1 dev h1-eth0.10"
        );
        assert_eq!(
            build_del_default_route_cmd("h1", gw, "h1-eth0.10").to_string(),
            "/sbin/ip -n h1 route del default via 172.16.1.1 dev h1-eth0.10"
        );
    }
}
