//! Resource backends.
//!
//! [`ResourceBackend`] is the seam between the provisioner and the kernel.
//! [`ShellBackend`] realises resources by running their commands through a
//! [`CommandRunner`].

use async_trait::async_trait;
use tracing::{debug, warn};
use vlanlab_common::{CommandError, CommandRunner};

use crate::error::{ResourceCreationError, ResourceTeardownError};
use crate::resource::{Handle, Resource};

/// Creates and destroys kernel resources.
///
/// `destroy` must be idempotent: destroying a resource that is already gone
/// succeeds.
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    async fn create(&self, resource: Resource) -> Result<Handle, ResourceCreationError>;

    async fn destroy(&self, handle: &Handle) -> Result<(), ResourceTeardownError>;
}

/// Backend that executes iproute2 / ovs-vsctl / sysctl commands.
#[derive(Debug, Default)]
pub struct ShellBackend<R> {
    runner: R,
}

impl<R: CommandRunner> ShellBackend<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs every destroy command, tolerating absent objects. Returns the
    /// first real failure.
    async fn run_destroy(&self, resource: &Resource) -> Result<(), CommandError> {
        let mut first_error = None;

        for cmd in resource.destroy_commands() {
            match self.runner.run_checked(&cmd).await {
                Ok(_) => {}
                Err(e) if e.is_absent() => {
                    debug!(command = %cmd, "Already absent");
                }
                Err(e) => {
                    warn!(resource = %resource, error = %e, "Destroy command failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<R: CommandRunner> ResourceBackend for ShellBackend<R> {
    async fn create(&self, resource: Resource) -> Result<Handle, ResourceCreationError> {
        for (applied, cmd) in resource.create_commands().iter().enumerate() {
            if let Err(source) = self.runner.run_checked(cmd).await {
                if applied > 0 {
                    debug!(resource = %resource, "Compensating partial creation");
                    // Best effort; the creation error is what gets reported.
                    let _ = self.run_destroy(&resource).await;
                }
                return Err(ResourceCreationError {
                    resource: resource.to_string(),
                    source,
                });
            }
        }

        debug!(resource = %resource, "Created");
        Ok(Handle::new(resource))
    }

    async fn destroy(&self, handle: &Handle) -> Result<(), ResourceTeardownError> {
        self.run_destroy(handle.resource())
            .await
            .map_err(|source| ResourceTeardownError {
                resource: handle.resource().to_string(),
                source,
            })?;
        debug!(resource = %handle, "Destroyed");
        Ok(())
    }
}
