//! Semantic error types for tlsdind.
//!
//! This module defines the error hierarchy for tlsdind, following the principle
//! of using semantic error enums (via `thiserror`) for conditions the caller
//! might inspect, while reserving opaque errors (`eyre::Report`) for the
//! application boundary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::lifecycle::LifecycleState;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file: {message}")]
    ParseError {
        /// A description of the parse error.
        message: String,
    },

    /// A required configuration value is missing.
    #[error("missing required configuration: {field}")]
    MissingRequired {
        /// The name of the missing field.
        field: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// The `OrthoConfig` library returned an error during configuration loading.
    #[error("configuration loading failed: {0}")]
    OrthoConfig(Arc<ortho_config::OrthoError>),
}

/// Errors that can occur during container engine operations.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Failed to connect to the container engine socket.
    #[error("failed to connect to container engine: {message}")]
    ConnectionFailed {
        /// A description of the connection failure.
        message: String,
    },

    /// The container engine socket was not found.
    #[error("container engine socket not found: {path}")]
    SocketNotFound {
        /// The path where the socket was expected.
        path: PathBuf,
    },

    /// Permission denied when accessing the container engine socket.
    #[error("permission denied accessing container socket: {path}")]
    PermissionDenied {
        /// The path to the socket.
        path: PathBuf,
    },

    /// Failed to pull the container image.
    #[error("failed to pull image '{image}': {message}")]
    ImagePullFailed {
        /// The image reference that was pulled.
        image: String,
        /// A description of the pull failure.
        message: String,
    },

    /// Failed to create a container.
    #[error("failed to create container: {message}")]
    CreateFailed {
        /// A description of the creation failure.
        message: String,
    },

    /// Failed to start a container.
    #[error("failed to start container '{container_id}': {message}")]
    StartFailed {
        /// The ID of the container that failed to start.
        container_id: String,
        /// A description of the start failure.
        message: String,
    },

    /// Failed to inspect a container.
    #[error("failed to inspect container '{container_id}': {message}")]
    InspectFailed {
        /// The ID of the inspected container.
        container_id: String,
        /// A description of the inspect failure.
        message: String,
    },

    /// Failed to read container logs.
    #[error("failed to read logs of container '{container_id}': {message}")]
    LogsFailed {
        /// The ID of the container.
        container_id: String,
        /// A description of the log failure.
        message: String,
    },

    /// A container port has no host port bound to it.
    #[error("container '{container_id}' has no host port bound to {port}/tcp")]
    PortNotBound {
        /// The ID of the container.
        container_id: String,
        /// The container-internal port that was looked up.
        port: u16,
    },

    /// Failed to stop or remove a container.
    #[error("failed to remove container '{container_id}': {message}")]
    RemoveFailed {
        /// The ID of the container.
        container_id: String,
        /// A description of the removal failure.
        message: String,
    },

    /// The container behind a handle has already been removed.
    #[error("container handle '{container_id}' has expired")]
    HandleExpired {
        /// The ID of the removed container.
        container_id: String,
    },

    /// The readiness wait did not succeed within its budget.
    #[error("container '{container_id}' did not become ready within {timeout:?}")]
    ReadinessTimeout {
        /// The ID of the container.
        container_id: String,
        /// The overall readiness budget that elapsed.
        timeout: Duration,
        /// The last error-stream log snapshot, for diagnostics.
        logs: String,
    },

    /// The container exited before it became ready.
    #[error("container '{container_id}' exited before becoming ready (exit code {exit_code:?})")]
    ContainerExited {
        /// The ID of the container.
        container_id: String,
        /// The exit code reported by the engine, if any.
        exit_code: Option<i64>,
        /// The last error-stream log snapshot, for diagnostics.
        logs: String,
    },

    /// Health check failed - engine did not respond correctly.
    #[error("container engine health check failed: {message}")]
    HealthCheckFailed {
        /// A description of the health check failure.
        message: String,
    },

    /// Health check timed out.
    #[error("container engine health check timed out after {seconds} seconds")]
    HealthCheckTimeout {
        /// The timeout duration in seconds.
        seconds: u64,
    },
}

/// Errors that can occur during host filesystem operations.
#[derive(Debug, Error)]
pub enum FilesystemError {
    /// The certificate staging directory could not be prepared.
    #[error("failed to prepare staging directory '{path}': {message}")]
    StagingFailed {
        /// The staging path that could not be created.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// An I/O error occurred.
    #[error("I/O error at '{path}': {message}")]
    IoError {
        /// The path where the error occurred.
        path: PathBuf,
        /// A description of the I/O error.
        message: String,
    },
}

/// Errors raised by the fixture lifecycle state machine.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Connection properties were accessed before the fixture became ready.
    #[error("fixture is not ready (current state: {state})")]
    NotReady {
        /// The state the fixture was in at access time.
        state: LifecycleState,
    },

    /// A lifecycle hook was invoked from a state that does not allow it.
    #[error("cannot {operation} a fixture in state {state}")]
    InvalidTransition {
        /// The hook that was invoked.
        operation: &'static str,
        /// The state the fixture was in.
        state: LifecycleState,
    },
}

/// Top-level error type for tlsdind.
///
/// This enum aggregates all domain-specific errors into a single type. At the
/// application boundary (main.rs), these errors are converted to
/// `eyre::Report` for human-readable error reporting.
#[derive(Debug, Error)]
pub enum DindError {
    /// An error occurred during configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred during container operations.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// An error occurred during filesystem operations.
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    /// A lifecycle precondition was violated.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// A specialised `Result` type for tlsdind operations.
pub type Result<T> = std::result::Result<T, DindError>;
