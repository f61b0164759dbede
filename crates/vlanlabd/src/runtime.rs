//! Per-session ownership of live kernel resources.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::resource::{Handle, ResourceKind};

/// All resources created in one provisioning session, in creation order.
///
/// Produced by `Provisioner::provision` and consumed by `teardown`. Not
/// `Clone`: exactly one owner may destroy the handles.
#[derive(Debug)]
#[must_use = "a provisioned network must be torn down"]
pub struct RuntimeState {
    session: Uuid,
    topology: String,
    started_at: DateTime<Utc>,
    handles: Vec<Handle>,
}

impl RuntimeState {
    pub fn new(topology: impl Into<String>) -> Self {
        Self {
            session: Uuid::new_v4(),
            topology: topology.into(),
            started_at: Utc::now(),
            handles: Vec::new(),
        }
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn topology_name(&self) -> &str {
        &self.topology
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time since provisioning started.
    pub fn uptime(&self) -> Duration {
        Utc::now() - self.started_at
    }

    /// Live handles in creation order.
    pub fn handles(&self) -> &[Handle] {
        &self.handles
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn count_of(&self, kind: ResourceKind) -> usize {
        self.handles
            .iter()
            .filter(|h| h.resource().kind() == kind)
            .count()
    }

    pub(crate) fn push(&mut self, handle: Handle) {
        self.handles.push(handle);
    }

    pub(crate) fn take_handles(&mut self) -> Vec<Handle> {
        std::mem::take(&mut self.handles)
    }
}

impl Drop for RuntimeState {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            warn!(
                session = %self.session,
                topology = %self.topology,
                live = self.handles.len(),
                "Runtime state dropped with live resources; run cleanup"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;

    #[test]
    fn test_accounting() {
        let mut state = RuntimeState::new("test");
        assert!(state.is_empty());

        state.push(Handle::new(Resource::Namespace {
            name: "h1".to_string(),
        }));
        state.push(Handle::new(Resource::Switch {
            name: "s1".to_string(),
        }));
        assert_eq!(state.handle_count(), 2);
        assert_eq!(state.count_of(ResourceKind::Switch), 1);
        assert_eq!(state.topology_name(), "test");

        let handles = state.take_handles();
        assert_eq!(handles.len(), 2);
        assert!(state.is_empty());
    }

    #[test]
    fn test_uptime() {
        let state = RuntimeState::new("t");
        assert!(state.started_at() <= Utc::now());
        assert!(state.uptime() >= Duration::zero());
    }

    #[test]
    fn test_sessions_are_distinct() {
        let a = RuntimeState::new("t");
        let b = RuntimeState::new("t");
        assert_ne!(a.session(), b.session());
    }
}
