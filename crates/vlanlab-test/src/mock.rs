//! In-memory kernel backend.
//!
//! [`MockKernel`] implements [`ResourceBackend`] without touching the host.
//! It tracks live resources and enforces the same dependency rules the
//! kernel does: a veth end needs its namespace or switch, a sub-interface
//! needs its parent device, an address needs its device, a route needs an
//! address on its device. Destroying something another live resource still
//! needs fails as busy, so ordering regressions show up as test failures.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::debug;
use vlanlab_common::CommandError;
use vlanlab_types::IfName;
use vlanlabd::resource::{Attachment, Handle, Resource, ResourceKind};
use vlanlabd::{ResourceBackend, ResourceCreationError, ResourceTeardownError};

/// Something a resource needs to exist before it can be created.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Namespace(String),
    Switch(String),
    Device {
        netns: Option<String>,
        name: IfName,
    },
    Address {
        netns: String,
        device: IfName,
    },
}

impl Requirement {
    fn satisfied_by(&self, resource: &Resource) -> bool {
        match (self, resource) {
            (Requirement::Namespace(ns), Resource::Namespace { name }) => ns == name,
            (Requirement::Switch(sw), Resource::Switch { name }) => sw == name,
            (Requirement::Device { netns, name }, Resource::Link { a, b }) => [a, b]
                .iter()
                .any(|end| end.attach.netns() == netns.as_deref() && &end.ifname == name),
            (
                Requirement::Device { netns, name },
                Resource::VlanInterface {
                    netns: vns,
                    name: vname,
                    ..
                },
            ) => netns.as_deref() == Some(vns.as_str()) && name == vname,
            (
                Requirement::Address { netns, device },
                Resource::Address {
                    netns: ans,
                    device: adev,
                    ..
                },
            ) => netns == ans && device == adev,
            _ => false,
        }
    }

    fn describe(&self) -> String {
        match self {
            Requirement::Namespace(ns) => {
                format!("Cannot open network namespace \"{}\": No such file or directory", ns)
            }
            Requirement::Switch(sw) => format!("ovs-vsctl: no bridge named {}", sw),
            Requirement::Device { name, .. } => format!("Cannot find device \"{}\"", name),
            Requirement::Address { device, .. } => {
                format!("Error: Nexthop has invalid gateway (no address on {})", device)
            }
        }
    }
}

fn requirements(resource: &Resource) -> Vec<Requirement> {
    match resource {
        Resource::Namespace { .. } | Resource::Switch { .. } => Vec::new(),
        Resource::Link { a, b } => [a, b]
            .iter()
            .map(|end| match &end.attach {
                Attachment::Netns(ns) => Requirement::Namespace(ns.clone()),
                Attachment::Switch(sw) => Requirement::Switch(sw.clone()),
            })
            .collect(),
        Resource::VlanInterface { netns, parent, .. } => vec![
            Requirement::Namespace(netns.clone()),
            Requirement::Device {
                netns: Some(netns.clone()),
                name: parent.clone(),
            },
        ],
        Resource::Address { netns, device, .. } => vec![Requirement::Device {
            netns: Some(netns.clone()),
            name: device.clone(),
        }],
        Resource::Forwarding { netns } => vec![Requirement::Namespace(netns.clone())],
        Resource::Trunk { switch, port, .. } => vec![
            Requirement::Switch(switch.clone()),
            Requirement::Device {
                netns: None,
                name: port.clone(),
            },
        ],
        Resource::DefaultRoute { netns, device, .. } => vec![Requirement::Address {
            netns: netns.clone(),
            device: device.clone(),
        }],
    }
}

/// A backend call observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Created(Resource),
    CreateFailed(Resource),
    Destroyed(Resource),
    /// Destroy of a resource that was not live.
    DestroyedAbsent(Resource),
    DestroyFailed(Resource),
}

#[derive(Debug, Default)]
struct KernelState {
    live: Vec<Resource>,
    events: Vec<MockEvent>,
    create_calls: usize,
}

/// Mock kernel backend with dependency checking and failure injection.
#[derive(Debug, Default)]
pub struct MockKernel {
    state: Mutex<KernelState>,
    fail_create_at: Option<usize>,
    fail_destroy_of: HashSet<ResourceKind>,
}

impl MockKernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the `n`-th create call (0-based).
    pub fn fail_create_at(mut self, n: usize) -> Self {
        self.fail_create_at = Some(n);
        self
    }

    /// Fails every destroy of resources of `kind`; they stay live.
    pub fn fail_destroy_of(mut self, kind: ResourceKind) -> Self {
        self.fail_destroy_of.insert(kind);
        self
    }

    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Live resources in creation order.
    pub fn live_resources(&self) -> Vec<Resource> {
        self.state.lock().live.clone()
    }

    pub fn live_of(&self, kind: ResourceKind) -> Vec<Resource> {
        self.state
            .lock()
            .live
            .iter()
            .filter(|r| r.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn is_live(&self, resource: &Resource) -> bool {
        self.state.lock().live.contains(resource)
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().create_calls
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.state.lock().events.clone()
    }

    /// Resources destroyed so far, in destroy order.
    pub fn destroyed(&self) -> Vec<Resource> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                MockEvent::Destroyed(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }
}

fn creation_error(resource: &Resource, output: impl Into<String>) -> ResourceCreationError {
    ResourceCreationError {
        resource: resource.to_string(),
        source: CommandError::failed(format!("mock create {}", resource), 2, output),
    }
}

#[async_trait]
impl ResourceBackend for MockKernel {
    async fn create(&self, resource: Resource) -> Result<Handle, ResourceCreationError> {
        let mut state = self.state.lock();
        let call = state.create_calls;
        state.create_calls += 1;

        let failure = if self.fail_create_at == Some(call) {
            Some("injected failure".to_string())
        } else if state.live.contains(&resource) {
            Some("RTNETLINK answers: File exists".to_string())
        } else {
            requirements(&resource)
                .into_iter()
                .find(|req| !state.live.iter().any(|r| req.satisfied_by(r)))
                .map(|req| req.describe())
        };

        if let Some(output) = failure {
            debug!(resource = %resource, %output, "Mock create failed");
            state.events.push(MockEvent::CreateFailed(resource.clone()));
            return Err(creation_error(&resource, output));
        }

        state.live.push(resource.clone());
        state.events.push(MockEvent::Created(resource.clone()));
        Ok(Handle::new(resource))
    }

    async fn destroy(&self, handle: &Handle) -> Result<(), ResourceTeardownError> {
        let resource = handle.resource();
        let mut state = self.state.lock();

        let Some(pos) = state.live.iter().position(|r| r == resource) else {
            state.events.push(MockEvent::DestroyedAbsent(resource.clone()));
            return Ok(());
        };

        let output = if self.fail_destroy_of.contains(&resource.kind()) {
            Some("Operation not permitted".to_string())
        } else {
            state
                .live
                .iter()
                .filter(|other| *other != resource)
                .find(|other| {
                    requirements(other)
                        .iter()
                        .any(|req| req.satisfied_by(resource))
                })
                .map(|user| format!("Device or resource busy (used by {})", user))
        };

        if let Some(output) = output {
            state.events.push(MockEvent::DestroyFailed(resource.clone()));
            return Err(ResourceTeardownError {
                resource: resource.to_string(),
                source: CommandError::failed(format!("mock destroy {}", resource), 2, output),
            });
        }

        state.live.remove(pos);
        state.events.push(MockEvent::Destroyed(resource.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns(name: &str) -> Resource {
        Resource::Namespace {
            name: name.to_string(),
        }
    }

    fn vlan_if() -> Resource {
        Resource::VlanInterface {
            netns: "h1".to_string(),
            parent: IfName::new("h1-eth0").unwrap(),
            vlan: vlanlab_types::VlanId::new(10).unwrap(),
            name: IfName::new("h1-eth0.10").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_missing_dependency() {
        let kernel = MockKernel::new();
        kernel.create(ns("h1")).await.unwrap();

        let err = kernel.create(vlan_if()).await.unwrap_err();
        assert!(err.source.to_string().contains("Cannot find device"));
        assert_eq!(kernel.live_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_create() {
        let kernel = MockKernel::new();
        kernel.create(ns("h1")).await.unwrap();
        assert!(kernel.create(ns("h1")).await.is_err());
        assert_eq!(kernel.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_busy_destroy() {
        let kernel = MockKernel::new();
        let ns_handle = kernel.create(ns("r1")).await.unwrap();
        let fwd = kernel
            .create(Resource::Forwarding {
                netns: "r1".to_string(),
            })
            .await
            .unwrap();

        assert!(kernel.destroy(&ns_handle).await.is_err());
        kernel.destroy(&fwd).await.unwrap();
        kernel.destroy(&ns_handle).await.unwrap();
        assert_eq!(kernel.live_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let kernel = MockKernel::new()
            .fail_create_at(1)
            .fail_destroy_of(ResourceKind::Namespace);
        let h1 = kernel.create(ns("h1")).await.unwrap();
        assert!(kernel.create(ns("h2")).await.is_err());
        kernel.create(ns("h3")).await.unwrap();

        assert!(kernel.destroy(&h1).await.is_err());
        assert!(kernel.is_live(&ns("h1")));
    }
}
