//! Teardown and stale-state reconciliation.
//!
//! Teardown never fails as a whole: each destroy error is logged and
//! collected into the [`TeardownReport`], and the remaining handles are still
//! destroyed.

use tracing::{info, instrument, warn};

use crate::backend::ResourceBackend;
use crate::error::ResourceTeardownError;
use crate::provisioner::plan;
use crate::resource::Handle;
use crate::runtime::RuntimeState;
use crate::topology::Topology;

/// Outcome of a teardown or reconcile pass.
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Handles whose destroy succeeded (including already-absent ones).
    pub destroyed: usize,
    pub failures: Vec<ResourceTeardownError>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Orders handles for destruction: by teardown phase (routes first,
/// namespaces and switches last), reverse creation order within a phase.
pub fn teardown_order(mut handles: Vec<Handle>) -> Vec<Handle> {
    handles.reverse();
    // Stable sort keeps the reversed creation order inside each phase.
    handles.sort_by_key(|h| h.resource().teardown_phase());
    handles
}

/// Destroys every handle of a session.
#[instrument(skip_all, fields(session = %state.session(), topology = %state.topology_name()))]
pub async fn teardown<B>(backend: &B, mut state: RuntimeState) -> TeardownReport
where
    B: ResourceBackend + ?Sized,
{
    let handles = teardown_order(state.take_handles());
    info!(
        resources = handles.len(),
        started_at = %state.started_at(),
        uptime_secs = state.uptime().num_seconds(),
        "Tearing down"
    );
    destroy_all(backend, handles).await
}

/// Destroys everything `topology` would create, whether or not it exists.
///
/// Used after a crashed session, when no `RuntimeState` survives.
#[instrument(skip_all, fields(topology = %topology.name()))]
pub async fn reconcile<B>(backend: &B, topology: &Topology) -> TeardownReport
where
    B: ResourceBackend + ?Sized,
{
    let handles: Vec<Handle> = plan(topology)
        .into_iter()
        .map(|planned| Handle::new(planned.resource))
        .collect();
    info!(resources = handles.len(), "Reconciling stale resources");
    destroy_all(backend, teardown_order(handles)).await
}

async fn destroy_all<B>(backend: &B, handles: Vec<Handle>) -> TeardownReport
where
    B: ResourceBackend + ?Sized,
{
    let mut report = TeardownReport::default();

    for handle in handles {
        match backend.destroy(&handle).await {
            Ok(()) => report.destroyed += 1,
            Err(e) => {
                warn!(
                    resource = %handle,
                    created_at = %handle.created_at(),
                    error = %e.source,
                    "Destroy failed; continuing"
                );
                report.failures.push(e);
            }
        }
    }

    info!(
        destroyed = report.destroyed,
        failed = report.failures.len(),
        "Teardown complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Resource, ResourceKind};
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;
    use vlanlab_types::{IfName, VlanId};

    fn ns(name: &str) -> Handle {
        Handle::new(Resource::Namespace {
            name: name.to_string(),
        })
    }

    fn vlan_if(netns: &str, parent: &str, vlan: u16) -> Handle {
        let parent = IfName::new(parent).unwrap();
        let vlan = VlanId::new(vlan).unwrap();
        Handle::new(Resource::VlanInterface {
            netns: netns.to_string(),
            name: parent.vlan_subinterface(vlan).unwrap(),
            parent,
            vlan,
        })
    }

    fn route(netns: &str) -> Handle {
        Handle::new(Resource::DefaultRoute {
            netns: netns.to_string(),
            gateway: Ipv4Addr::new(10, 0, 0, 1),
            device: IfName::new(format!("{}-eth0.10", netns)).unwrap(),
        })
    }

    #[test]
    fn test_teardown_order() {
        let handles = vec![
            ns("h1"),
            ns("h2"),
            vlan_if("h1", "h1-eth0", 10),
            vlan_if("h2", "h2-eth0", 10),
            route("h1"),
            route("h2"),
        ];

        let ordered: Vec<String> = teardown_order(handles)
            .iter()
            .map(|h| h.to_string())
            .collect();
        assert_eq!(
            ordered,
            vec![
                "default route via 10.0.0.1 dev h2-eth0.10 in h2",
                "default route via 10.0.0.1 dev h1-eth0.10 in h1",
                "vlan interface h2-eth0.10 in h2",
                "vlan interface h1-eth0.10 in h1",
                "namespace h2",
                "namespace h1",
            ]
        );
    }

    #[test]
    fn test_teardown_order_kinds() {
        let handles = vec![ns("r1"), Handle::new(Resource::Forwarding { netns: "r1".into() })];
        let kinds: Vec<ResourceKind> = teardown_order(handles)
            .iter()
            .map(|h| h.resource().kind())
            .collect();
        assert_eq!(kinds, vec![ResourceKind::Forwarding, ResourceKind::Namespace]);
    }

    #[test]
    fn test_report_clean() {
        let report = TeardownReport::default();
        assert!(report.is_clean());
        assert_eq!(report.destroyed, 0);
    }
}
