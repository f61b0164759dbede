//! Error types for topology validation, provisioning and teardown.
//!
//! All errors implement `std::error::Error` via `thiserror`.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use thiserror::Error;
use vlanlab_common::CommandError;
use vlanlab_types::{Ipv4Prefix, ParseError, VlanId};

use crate::provisioner::ProvisionStep;
use crate::teardown::TeardownReport;
use crate::topology::NodeRole;

/// A topology description was rejected. Raised before any kernel resource
/// is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyValidationError {
    #[error("duplicate node name '{0}'")]
    DuplicateNode(String),

    #[error("invalid node name '{name}': {reason}")]
    InvalidNodeName { name: String, reason: String },

    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("link {a} <-> {b} references unknown node '{missing}'")]
    UnknownEndpoint {
        a: String,
        b: String,
        missing: String,
    },

    #[error("link from '{0}' to itself")]
    SelfLoop(String),

    #[error("derived interface name is invalid: {0}")]
    InterfaceName(#[from] ParseError),

    #[error("VLAN id {0} is outside 1-4094")]
    InvalidVlanId(u16),

    #[error("VLAN {vlan} has an invalid subnet: {reason}")]
    InvalidSubnet { vlan: u16, reason: String },

    #[error("VLAN {0} declared twice")]
    DuplicateVlan(VlanId),

    #[error("VLAN {a} subnet {a_subnet} overlaps VLAN {b} subnet {b_subnet}")]
    VlanOverlap {
        a: VlanId,
        a_subnet: Ipv4Prefix,
        b: VlanId,
        b_subnet: Ipv4Prefix,
    },

    #[error("VLAN {vlan} gateway {gateway} is not a host address of {subnet}")]
    GatewayOutsideSubnet {
        vlan: VlanId,
        gateway: Ipv4Addr,
        subnet: Ipv4Prefix,
    },

    #[error("node '{node}' references undeclared VLAN {vlan}")]
    UnknownVlan { node: String, vlan: u16 },

    #[error("node '{node}' address {address} is outside VLAN {vlan} subnet {subnet}")]
    AddressOutsideSubnet {
        node: String,
        vlan: VlanId,
        address: Ipv4Addr,
        subnet: Ipv4Prefix,
    },

    #[error("node '{node}' address {address} is the network or broadcast address of {subnet}")]
    ReservedAddress {
        node: String,
        address: Ipv4Addr,
        subnet: Ipv4Prefix,
    },

    #[error("address {address} assigned more than once")]
    DuplicateAddress { address: Ipv4Addr },

    #[error("node '{node}' is a {role} and cannot carry VLAN bindings")]
    BindingNotSupported { node: String, role: NodeRole },

    #[error("node '{node}' is a {role}; only routers serve VLANs")]
    ServesOnNonRouter { node: String, role: NodeRole },

    #[error("node '{node}' has no interface in slot {slot}")]
    NoInterface { node: String, slot: u16 },

    #[error("node '{node}' has more links than interface slots")]
    TooManyLinks { node: String },

    #[error("node '{0}' declares more than one gateway")]
    MultipleGateways(String),

    #[error("node '{node}' binds VLAN {vlan} on slot {slot} twice")]
    DuplicateBinding {
        node: String,
        vlan: VlanId,
        slot: u16,
    },

    #[error("node '{node}' gateway {gateway} is outside VLAN {vlan} subnet {subnet}")]
    BindingGatewayOutsideSubnet {
        node: String,
        vlan: VlanId,
        gateway: Ipv4Addr,
        subnet: Ipv4Prefix,
    },

    #[error("trunk policy on link {a} <-> {b}, which is not switch-to-switch")]
    TrunkOnNonSwitchLink { a: String, b: String },

    #[error("trunk policy on link {a} <-> {b} allows no VLANs")]
    EmptyTrunk { a: String, b: String },

    #[error("trunk policy on link {a} <-> {b} allows undeclared VLAN {vlan}")]
    TrunkVlanUndeclared { a: String, b: String, vlan: u16 },
}

/// A single resource could not be created.
#[derive(Debug, Error)]
#[error("failed to create {resource}")]
pub struct ResourceCreationError {
    /// Rendered resource description.
    pub resource: String,
    #[source]
    pub source: CommandError,
}

/// A single resource could not be destroyed. Non-fatal; collected into a
/// [`TeardownReport`].
#[derive(Debug, Error)]
#[error("failed to destroy {resource}")]
pub struct ResourceTeardownError {
    /// Rendered resource description.
    pub resource: String,
    #[source]
    pub source: CommandError,
}

/// Provisioning stopped at a failed creation. Everything created before the
/// failure has already been rolled back; `rollback` reports how that went.
#[derive(Debug, Error)]
#[error("provisioning failed at step '{step}' on {resource}")]
pub struct ProvisioningError {
    pub step: ProvisionStep,
    pub resource: String,
    #[source]
    pub source: ResourceCreationError,
    pub rollback: TeardownReport,
}

/// Loading a topology file failed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read topology file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse topology file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid topology: {0}")]
    Invalid(#[from] TopologyValidationError),
}
