//! Error types for kernel command execution.
//!
//! All errors implement `std::error::Error` via `thiserror`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::io;
use thiserror::Error;

/// Result type alias for command execution.
pub type CommandResult<T> = Result<T, CommandError>;

/// Diagnostics printed by iproute2, sysctl and ovs-vsctl when the object a
/// command operates on is already gone.
static ABSENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(cannot find device|no such file or directory|cannot open network namespace|no such process|no such device|cannot assign requested address|no (port|bridge|interface) named|does not exist)",
    )
    .expect("Invalid regex pattern")
});

/// Errors that can occur while running a kernel command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The process could not be spawned.
    #[error("Failed to execute command '{command}': {source}")]
    Spawn {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The command returned a non-zero exit code.
    #[error("Command failed: '{command}' (exit code {exit_code}): {output}")]
    Failed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// The command was rejected before execution.
    #[error("Invalid argument {argument:?} for '{program}': {reason}")]
    InvalidArgument {
        /// Program the argument was destined for.
        program: String,
        /// The offending argument.
        argument: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl CommandError {
    /// Creates a non-zero exit error.
    pub fn failed(command: impl Into<String>, exit_code: i32, output: impl Into<String>) -> Self {
        Self::Failed {
            command: command.into(),
            exit_code,
            output: output.into(),
        }
    }

    /// Returns true if the failure means the target object does not exist.
    ///
    /// Destroy operations treat this as success.
    pub fn is_absent(&self) -> bool {
        match self {
            CommandError::Failed { output, .. } => ABSENT_RE.is_match(output),
            _ => false,
        }
    }
}
