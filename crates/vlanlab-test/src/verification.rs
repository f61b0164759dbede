//! Verification helpers for provisioning tests
//!
//! Provides assertion helpers over the live state of a [`MockKernel`]

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use thiserror::Error;
use vlanlabd::resource::{Resource, ResourceKind};

use crate::mock::MockKernel;

/// Verification error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VerificationError {
    #[error("{count} resources still live, first: {first}")]
    ResourcesLeaked { count: usize, first: String },

    #[error("expected {expected} live {kind} resources, found {actual}")]
    CountMismatch {
        kind: ResourceKind,
        expected: usize,
        actual: usize,
    },

    #[error("no address {address} on {device} in {netns}")]
    AddressMissing {
        netns: String,
        device: String,
        address: Ipv4Addr,
    },

    #[error("trunk on port '{port}' allows {actual:?}, expected {expected:?}")]
    TrunkMismatch {
        port: String,
        expected: Vec<u16>,
        actual: Option<Vec<u16>>,
    },

    #[error("no default route via {gateway} in {netns}")]
    RouteMissing { netns: String, gateway: Ipv4Addr },

    #[error("forwarding is {actual} in {netns}, expected {expected}")]
    ForwardingMismatch {
        netns: String,
        expected: bool,
        actual: bool,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Live kernel state verification helper
pub struct KernelVerifier<'a> {
    kernel: &'a MockKernel,
}

impl<'a> KernelVerifier<'a> {
    pub fn new(kernel: &'a MockKernel) -> Self {
        Self { kernel }
    }

    /// Verify that nothing is left behind
    pub fn assert_clean(&self) -> VerifyResult<()> {
        let live = self.kernel.live_resources();
        match live.first() {
            None => Ok(()),
            Some(first) => Err(VerificationError::ResourcesLeaked {
                count: live.len(),
                first: first.to_string(),
            }),
        }
    }

    /// Verify the number of live resources of one kind
    pub fn assert_count(&self, kind: ResourceKind, expected: usize) -> VerifyResult<()> {
        let actual = self.kernel.live_of(kind).len();
        if actual != expected {
            return Err(VerificationError::CountMismatch {
                kind,
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Verify that `device` in `netns` carries `address`
    pub fn assert_address(&self, netns: &str, device: &str, address: Ipv4Addr) -> VerifyResult<()> {
        let found = self.kernel.live_of(ResourceKind::Address).iter().any(|r| {
            matches!(r, Resource::Address { netns: n, device: d, address: a, .. }
                if n == netns && d.as_str() == device && *a == address)
        });
        if !found {
            return Err(VerificationError::AddressMissing {
                netns: netns.to_string(),
                device: device.to_string(),
                address,
            });
        }
        Ok(())
    }

    /// Verify the allow-list of a trunk port
    pub fn assert_trunk(&self, port: &str, expected: &[u16]) -> VerifyResult<()> {
        let actual = self
            .kernel
            .live_of(ResourceKind::Trunk)
            .into_iter()
            .find_map(|r| match r {
                Resource::Trunk { port: p, vlans, .. } if p.as_str() == port => {
                    Some(vlans.iter().map(|v| v.as_u16()).collect::<Vec<_>>())
                }
                _ => None,
            });

        let expected_set: BTreeSet<u16> = expected.iter().copied().collect();
        let expected: Vec<u16> = expected_set.into_iter().collect();
        if actual.as_ref() != Some(&expected) {
            return Err(VerificationError::TrunkMismatch {
                port: port.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Verify that `netns` has a default route via `gateway`
    pub fn assert_default_route(&self, netns: &str, gateway: Ipv4Addr) -> VerifyResult<()> {
        let found = self.kernel.live_of(ResourceKind::DefaultRoute).iter().any(|r| {
            matches!(r, Resource::DefaultRoute { netns: n, gateway: g, .. }
                if n == netns && *g == gateway)
        });
        if !found {
            return Err(VerificationError::RouteMissing {
                netns: netns.to_string(),
                gateway,
            });
        }
        Ok(())
    }

    /// Verify whether IP forwarding is enabled in `netns`
    pub fn assert_forwarding(&self, netns: &str, expected: bool) -> VerifyResult<()> {
        let actual = self
            .kernel
            .live_of(ResourceKind::Forwarding)
            .iter()
            .any(|r| matches!(r, Resource::Forwarding { netns: n } if n == netns));
        if actual != expected {
            return Err(VerificationError::ForwardingMismatch {
                netns: netns.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}
