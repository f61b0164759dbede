//! Common infrastructure for the vlanlab topology orchestrator.
//!
//! - [`shell`]: typed kernel command builder and command runners
//! - [`error`]: error types for command execution
//!
//! The orchestrator configures the Linux network stack by running
//! `ip`, `ovs-vsctl` and `sysctl`. Every invocation is built as a
//! [`ShellCommand`] and executed through a [`CommandRunner`], which is either
//! the real [`SystemRunner`] or the in-memory [`RecordingRunner`] used for
//! dry runs and tests.

pub mod error;
pub mod shell;

pub use error::{CommandError, CommandResult};
pub use shell::{CommandRunner, ExecResult, RecordingRunner, ShellCommand, SystemRunner};
