//! Integration test infrastructure for the vlanlab orchestrator
//!
//! Provides:
//! - An in-memory kernel backend with dependency checking
//! - Test fixtures for common topologies
//! - Live-state verification helpers

pub mod fixtures;
pub mod mock;
mod verification;

pub use fixtures::*;
pub use mock::{MockEvent, MockKernel};
pub use verification::*;
