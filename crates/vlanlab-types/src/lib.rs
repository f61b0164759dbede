//! Common types for virtual network topology provisioning.
//!
//! This crate provides type-safe representations of the network primitives
//! the vlanlab orchestrator hands to the kernel:
//!
//! - [`VlanId`]: IEEE 802.1Q VLAN identifiers
//! - [`Ipv4Prefix`]: IPv4 subnets (CIDR notation) with membership tests
//! - [`IfName`]: Linux network interface names (15-byte limit)

mod ifname;
mod ip;
mod vlan;

pub use ifname::IfName;
pub use ip::Ipv4Prefix;
pub use vlan::VlanId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid IP prefix format: {0}")]
    InvalidIpPrefix(String),

    #[error("invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(u16),

    #[error("invalid interface name '{name}': {reason}")]
    InvalidInterfaceName { name: String, reason: String },
}
