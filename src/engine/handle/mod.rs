//! Handles to running fixture containers.

use std::sync::Arc;

use super::{ContainerLogs, ContainerRunState, ContainerRuntimeClient, EngineConnector};
use crate::error::{ContainerError, DindError};

/// Live reference to a container started by the engine.
///
/// The handle is identified by the engine-assigned container ID. Once
/// [`ContainerHandle::stop_and_remove`] has succeeded the handle is expired
/// and every further query fails with `ContainerError::HandleExpired`.
#[derive(Debug)]
pub struct ContainerHandle<E> {
    id: String,
    host: String,
    engine: Arc<E>,
    removed: bool,
}

impl<E: ContainerRuntimeClient> ContainerHandle<E> {
    /// Wrap a started container.
    ///
    /// `host` is the host name under which the container's published ports
    /// are reachable.
    #[must_use]
    pub fn new(id: impl Into<String>, host: impl Into<String>, engine: Arc<E>) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            engine,
            removed: false,
        }
    }

    /// Return the engine-assigned container ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Return whether the container has been removed.
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        self.removed
    }

    /// Return the host name for reaching published ports.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::HandleExpired` after removal.
    pub fn hostname(&self) -> Result<&str, DindError> {
        self.ensure_live()?;
        Ok(&self.host)
    }

    /// Return a snapshot of the container's output streams.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::HandleExpired` after removal and
    /// `ContainerError::LogsFailed` when the engine call fails.
    pub async fn logs(&self) -> Result<ContainerLogs, DindError> {
        self.ensure_live()?;
        EngineConnector::container_logs_async(self.engine.as_ref(), &self.id).await
    }

    /// Return the host port bound to `container_port`.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::HandleExpired` after removal,
    /// `ContainerError::InspectFailed` when inspection fails, and
    /// `ContainerError::PortNotBound` when the port is not published.
    pub async fn mapped_port(&self, container_port: u16) -> Result<u16, DindError> {
        self.ensure_live()?;
        EngineConnector::mapped_port_async(self.engine.as_ref(), &self.id, container_port).await
    }

    /// Return the container's run state.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::HandleExpired` after removal and
    /// `ContainerError::InspectFailed` when inspection fails.
    pub async fn state(&self) -> Result<ContainerRunState, DindError> {
        self.ensure_live()?;
        EngineConnector::container_state_async(self.engine.as_ref(), &self.id).await
    }

    /// Stop and remove the container, expiring the handle.
    ///
    /// Calling this on an already-expired handle is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::RemoveFailed` when the engine refuses; the
    /// handle stays live so the call can be retried.
    pub async fn stop_and_remove(&mut self) -> Result<(), DindError> {
        if self.removed {
            return Ok(());
        }
        EngineConnector::stop_and_remove_async(self.engine.as_ref(), &self.id).await?;
        self.removed = true;
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), DindError> {
        if self.removed {
            return Err(DindError::from(ContainerError::HandleExpired {
                container_id: self.id.clone(),
            }));
        }
        Ok(())
    }
}
