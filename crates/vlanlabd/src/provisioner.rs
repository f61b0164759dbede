//! Topology provisioner.
//!
//! Materialises a [`Topology`] against a [`ResourceBackend`] in strict
//! dependency order:
//!
//! 1. namespaces (hosts, routers) and virtual switches
//! 2. veth links, each end in its namespace or attached to its switch
//! 3. host VLAN sub-interfaces and addresses
//! 4. router forwarding, served VLAN gateways and router bindings
//! 5. trunk allow-lists on inter-switch ports
//! 6. default routes
//!
//! The first failed creation aborts provisioning and rolls back everything
//! created so far.

use std::fmt;
use tracing::{error, info, instrument};

use crate::backend::ResourceBackend;
use crate::error::ProvisioningError;
use crate::policy::{compute_assignments, NodePolicy};
use crate::resource::{Attachment, LinkEnd, Resource, ResourceKind};
use crate::runtime::RuntimeState;
use crate::teardown::{self, TeardownReport};
use crate::topology::{Endpoint, NodeRole, Topology};

/// Provisioning step a resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProvisionStep {
    Nodes,
    Links,
    HostVlans,
    RouterVlans,
    Trunks,
    Routes,
}

impl ProvisionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionStep::Nodes => "nodes",
            ProvisionStep::Links => "links",
            ProvisionStep::HostVlans => "host vlans",
            ProvisionStep::RouterVlans => "router vlans",
            ProvisionStep::Trunks => "trunks",
            ProvisionStep::Routes => "routes",
        }
    }
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource scheduled for creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedResource {
    pub step: ProvisionStep,
    pub resource: Resource,
}

fn link_end(topology: &Topology, endpoint: &Endpoint) -> LinkEnd {
    let namespaced = topology
        .node(&endpoint.node)
        .map(|n| n.role().is_namespaced())
        .unwrap_or(false);
    let attach = if namespaced {
        Attachment::Netns(endpoint.node.clone())
    } else {
        Attachment::Switch(endpoint.node.clone())
    };
    LinkEnd {
        attach,
        ifname: endpoint.ifname.clone(),
    }
}

fn push_vlan_interfaces(
    out: &mut Vec<PlannedResource>,
    step: ProvisionStep,
    netns: &str,
    policy: &NodePolicy,
) {
    for iface in &policy.interfaces {
        out.push(PlannedResource {
            step,
            resource: Resource::VlanInterface {
                netns: netns.to_string(),
                parent: iface.parent.clone(),
                vlan: iface.vlan,
                name: iface.name.clone(),
            },
        });
        out.push(PlannedResource {
            step,
            resource: Resource::Address {
                netns: netns.to_string(),
                device: iface.name.clone(),
                address: iface.address,
                prefix_len: iface.prefix_len,
            },
        });
    }
}

/// Computes the ordered list of resources provisioning `topology` creates.
pub fn plan(topology: &Topology) -> Vec<PlannedResource> {
    let policy = compute_assignments(topology);
    let mut out = Vec::new();

    for node in topology.nodes() {
        let name = node.name().to_string();
        let resource = if node.role().is_namespaced() {
            Resource::Namespace { name }
        } else {
            Resource::Switch { name }
        };
        out.push(PlannedResource {
            step: ProvisionStep::Nodes,
            resource,
        });
    }

    for link in topology.links() {
        let [a, b] = link.endpoints();
        out.push(PlannedResource {
            step: ProvisionStep::Links,
            resource: Resource::Link {
                a: link_end(topology, a),
                b: link_end(topology, b),
            },
        });
    }

    for node in topology.nodes().iter().filter(|n| n.role() == NodeRole::Host) {
        if let Some(node_policy) = policy.node(node.name()) {
            push_vlan_interfaces(&mut out, ProvisionStep::HostVlans, node.name(), node_policy);
        }
    }

    for node in topology.nodes().iter().filter(|n| n.role() == NodeRole::Router) {
        let Some(node_policy) = policy.node(node.name()) else {
            continue;
        };
        if node_policy.forwarding {
            out.push(PlannedResource {
                step: ProvisionStep::RouterVlans,
                resource: Resource::Forwarding {
                    netns: node.name().to_string(),
                },
            });
        }
        push_vlan_interfaces(&mut out, ProvisionStep::RouterVlans, node.name(), node_policy);
    }

    for trunk in &policy.trunks {
        out.push(PlannedResource {
            step: ProvisionStep::Trunks,
            resource: Resource::Trunk {
                switch: trunk.switch.clone(),
                port: trunk.port.clone(),
                vlans: trunk.allowed.clone(),
            },
        });
    }

    for node in topology.nodes() {
        let Some(route) = policy.node(node.name()).and_then(|p| p.default_route.as_ref()) else {
            continue;
        };
        out.push(PlannedResource {
            step: ProvisionStep::Routes,
            resource: Resource::DefaultRoute {
                netns: node.name().to_string(),
                gateway: route.gateway,
                device: route.device.clone(),
            },
        });
    }

    out
}

/// Drives a [`ResourceBackend`] through provisioning and teardown.
#[derive(Debug)]
pub struct Provisioner<B> {
    backend: B,
}

impl<B: ResourceBackend> Provisioner<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Creates every resource of `topology`.
    ///
    /// On failure, everything created so far is destroyed before the error
    /// is returned; no partially provisioned network survives.
    #[instrument(skip_all, fields(topology = %topology.name()))]
    pub async fn provision(&self, topology: &Topology) -> Result<RuntimeState, ProvisioningError> {
        let mut state = RuntimeState::new(topology.name());
        let planned = plan(topology);
        info!(
            session = %state.session(),
            resources = planned.len(),
            "Provisioning topology"
        );

        let mut current_step = None;
        for PlannedResource { step, resource } in planned {
            if current_step != Some(step) {
                info!(step = %step, "Starting step");
                current_step = Some(step);
            }

            let rendered = resource.to_string();
            match self.backend.create(resource).await {
                Ok(handle) => state.push(handle),
                Err(source) => {
                    error!(
                        step = %step,
                        resource = %rendered,
                        error = %source.source,
                        "Creation failed; rolling back"
                    );
                    let rollback = self.teardown(state).await;
                    return Err(ProvisioningError {
                        step,
                        resource: rendered,
                        source,
                        rollback,
                    });
                }
            }
        }

        info!(
            resources = state.handle_count(),
            namespaces = state.count_of(ResourceKind::Namespace),
            switches = state.count_of(ResourceKind::Switch),
            links = state.count_of(ResourceKind::Link),
            "Provisioning complete"
        );
        Ok(state)
    }

    /// Destroys every resource of a session.
    pub async fn teardown(&self, state: RuntimeState) -> TeardownReport {
        teardown::teardown(&self.backend, state).await
    }

    /// Destroys any leftovers of `topology` from an earlier session.
    pub async fn reconcile(&self, topology: &Topology) -> TeardownReport {
        teardown::reconcile(&self.backend, topology).await
    }
}
