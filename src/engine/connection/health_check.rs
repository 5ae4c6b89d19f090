//! Health check and connect-and-verify functionality.
//!
//! Bollard connects lazily, so a missing or unreadable socket only surfaces on
//! the first request. These helpers ping the engine with a timeout and
//! classify failures into actionable errors.

use std::time::Duration;

use bollard::Docker;

use super::error_classification::classify_connection_error;
use super::{EngineConnector, HEALTH_CHECK_TIMEOUT_SECS, SocketResolver};
use crate::error::{ContainerError, DindError};

impl EngineConnector {
    /// Perform a ping with timeout, classifying failures against `socket`.
    async fn ping_with_timeout(docker: &Docker, socket: &str) -> Result<(), DindError> {
        let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

        tokio::time::timeout(timeout, docker.ping())
            .await
            .map_err(|_| {
                DindError::from(ContainerError::HealthCheckTimeout {
                    seconds: HEALTH_CHECK_TIMEOUT_SECS,
                })
            })?
            .map_err(|e| {
                let classified = match classify_connection_error(&e, socket) {
                    ContainerError::ConnectionFailed { message } => {
                        ContainerError::HealthCheckFailed { message }
                    }
                    other => other,
                };
                DindError::from(classified)
            })?;
        Ok(())
    }

    /// Verify the container engine is responsive.
    ///
    /// Sends a ping request to the engine and waits for a response.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::HealthCheckFailed` if the engine does not
    /// respond correctly, `ContainerError::SocketNotFound` or
    /// `ContainerError::PermissionDenied` when the socket cannot be used, and
    /// `ContainerError::HealthCheckTimeout` if the check times out.
    pub async fn health_check_async(docker: &Docker, socket: &str) -> Result<(), DindError> {
        Self::ping_with_timeout(docker, socket).await
    }

    /// Connect to the container engine and verify it responds.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::ConnectionFailed` if the connection fails, and
    /// the errors of [`Self::health_check_async`] if the ping fails.
    pub async fn connect_and_verify_async(socket: &str) -> Result<Docker, DindError> {
        let docker = Self::connect(socket)?;
        Self::ping_with_timeout(&docker, socket).await?;
        Ok(docker)
    }

    /// Connect using fallback resolution and verify the engine responds.
    ///
    /// Returns the connected client together with the socket it resolved to.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::connect_and_verify_async`].
    pub async fn connect_with_fallback_and_verify_async<E: mockable::Env>(
        config_socket: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<(Docker, String), DindError> {
        let socket = Self::resolve_socket(config_socket, resolver);
        let docker = Self::connect_and_verify_async(&socket).await?;
        Ok((docker, socket))
    }
}
