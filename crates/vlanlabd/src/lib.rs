//! vlanlabd - virtual VLAN topology orchestrator
//!
//! Builds an isolated L2/L3 test network out of Linux network namespaces,
//! Open vSwitch bridges, veth pairs and 802.1Q sub-interfaces, then tears it
//! down again in strict reverse order.
//!
//! - [`topology`]: validated declarative model ([`TopologyBuilder`])
//! - [`policy`]: per-node VLAN, address, route and trunk computation
//! - [`resource`] / [`backend`]: kernel primitives and the backend seam
//! - [`provisioner`] / [`teardown`]: ordered creation, rollback and cleanup
//! - [`config`] / [`scenario`]: TOML topology files and the built-in scenario

pub mod backend;
pub mod commands;
pub mod config;
pub mod error;
pub mod policy;
pub mod provisioner;
pub mod resource;
pub mod runtime;
pub mod scenario;
pub mod teardown;
pub mod topology;

pub use backend::{ResourceBackend, ShellBackend};
pub use config::{load_topology, parse_topology, TopologyFile};
pub use error::{
    ConfigError, ProvisioningError, ResourceCreationError, ResourceTeardownError,
    TopologyValidationError,
};
pub use policy::{compute_assignments, PolicyPlan};
pub use provisioner::{plan, PlannedResource, ProvisionStep, Provisioner};
pub use resource::{Handle, Resource, ResourceKind, TeardownPhase};
pub use runtime::RuntimeState;
pub use scenario::{reference_builder, reference_topology};
pub use teardown::{reconcile, teardown, TeardownReport};
pub use topology::{NodeRole, Topology, TopologyBuilder};
