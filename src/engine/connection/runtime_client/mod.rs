//! Post-create container operations used by the fixture lifecycle.
//!
//! The [`ContainerRuntimeClient`] trait covers starting, inspecting, reading
//! logs from, stopping, and removing a container. `EngineConnector` layers
//! error mapping and cleanup tolerance on top of it.

use std::future::Future;
use std::pin::Pin;

use bollard::Docker;
use bollard::container::LogOutput;
use bollard::models::{ContainerInspectResponse, ContainerStateStatusEnum};
use bollard::query_parameters::{
    InspectContainerOptions, LogsOptionsBuilder, RemoveContainerOptionsBuilder,
    StartContainerOptions, StopContainerOptionsBuilder,
};
use futures_util::TryStreamExt;
use tracing::{debug, warn};

use super::EngineConnector;
use super::create_container::ContainerCreator;
use super::error_classification::{is_already_stopped, is_not_found};
use crate::error::{ContainerError, DindError};

/// Seconds the engine waits for a graceful stop before killing the container.
const STOP_GRACE_SECS: i32 = 10;

/// Boxed future type returned by [`ContainerRuntimeClient`] implementors.
pub type EngineFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, bollard::errors::Error>> + Send + 'a>>;

/// Boxed future returned by [`ContainerRuntimeClient::inspect_container`].
pub type InspectContainerFuture<'a> = EngineFuture<'a, ContainerInspectResponse>;

/// Behaviour required to drive an already-created container.
///
/// Implemented for `bollard::Docker`; tests substitute `mockall` doubles.
pub trait ContainerRuntimeClient {
    /// Start a created container.
    fn start_container(&self, container_id: &str) -> EngineFuture<'_, ()>;

    /// Inspect a container.
    fn inspect_container(&self, container_id: &str) -> InspectContainerFuture<'_>;

    /// Read a snapshot of everything the container has logged so far.
    fn fetch_logs(&self, container_id: &str) -> EngineFuture<'_, ContainerLogs>;

    /// Stop a running container.
    fn stop_container(&self, container_id: &str) -> EngineFuture<'_, ()>;

    /// Remove a container and its anonymous volumes, forcing if needed.
    fn remove_container(&self, container_id: &str) -> EngineFuture<'_, ()>;
}

/// Full engine capability required by a fixture.
pub trait ContainerEngine: ContainerCreator + ContainerRuntimeClient + Send + Sync {}

impl<T> ContainerEngine for T where T: ContainerCreator + ContainerRuntimeClient + Send + Sync {}

impl ContainerRuntimeClient for Docker {
    fn start_container(&self, container_id: &str) -> EngineFuture<'_, ()> {
        let container_id_owned = String::from(container_id);

        Box::pin(async move {
            Self::start_container(self, &container_id_owned, None::<StartContainerOptions>).await
        })
    }

    fn inspect_container(&self, container_id: &str) -> InspectContainerFuture<'_> {
        let container_id_owned = String::from(container_id);

        Box::pin(async move {
            Self::inspect_container(self, &container_id_owned, None::<InspectContainerOptions>)
                .await
        })
    }

    fn fetch_logs(&self, container_id: &str) -> EngineFuture<'_, ContainerLogs> {
        let container_id_owned = String::from(container_id);

        Box::pin(async move {
            let options = LogsOptionsBuilder::default()
                .stdout(true)
                .stderr(true)
                .build();
            let chunks: Vec<LogOutput> = self
                .logs(&container_id_owned, Some(options))
                .try_collect()
                .await?;
            Ok(ContainerLogs::from_chunks(chunks))
        })
    }

    fn stop_container(&self, container_id: &str) -> EngineFuture<'_, ()> {
        let container_id_owned = String::from(container_id);

        Box::pin(async move {
            let options = StopContainerOptionsBuilder::default()
                .t(STOP_GRACE_SECS)
                .build();
            Self::stop_container(self, &container_id_owned, Some(options)).await
        })
    }

    fn remove_container(&self, container_id: &str) -> EngineFuture<'_, ()> {
        let container_id_owned = String::from(container_id);

        Box::pin(async move {
            let options = RemoveContainerOptionsBuilder::default()
                .force(true)
                .v(true)
                .build();
            Self::remove_container(self, &container_id_owned, Some(options)).await
        })
    }
}

/// One of the two container output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// A point-in-time snapshot of a container's output streams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerLogs {
    stdout: String,
    stderr: String,
}

impl ContainerLogs {
    /// Create a snapshot from already-demultiplexed stream contents.
    #[must_use]
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Return the contents of `stream`.
    #[must_use]
    pub fn stream(&self, stream: LogStream) -> &str {
        match stream {
            LogStream::Stdout => &self.stdout,
            LogStream::Stderr => &self.stderr,
        }
    }

    /// Return the standard output contents.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Return the standard error contents.
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    fn from_chunks(chunks: impl IntoIterator<Item = LogOutput>) -> Self {
        chunks
            .into_iter()
            .fold(Self::default(), |mut logs, chunk| {
                match chunk {
                    LogOutput::StdErr { message } => {
                        logs.stderr.push_str(&String::from_utf8_lossy(&message));
                    }
                    LogOutput::StdOut { message } | LogOutput::Console { message } => {
                        logs.stdout.push_str(&String::from_utf8_lossy(&message));
                    }
                    LogOutput::StdIn { .. } => {}
                }
                logs
            })
    }
}

/// Coarse run state of a container as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRunState {
    /// The container exists but has not been started.
    Created,
    /// The container is running.
    Running,
    /// The container has stopped or died.
    Exited {
        /// The exit code reported by the engine, if any.
        exit_code: Option<i64>,
    },
    /// The engine reported a state this crate does not distinguish.
    Unknown,
}

impl ContainerRunState {
    fn from_inspect(response: &ContainerInspectResponse) -> Self {
        let Some(state) = response.state.as_ref() else {
            return Self::Unknown;
        };

        if state.running == Some(true) {
            return Self::Running;
        }

        match state.status {
            Some(ContainerStateStatusEnum::RUNNING) => Self::Running,
            Some(ContainerStateStatusEnum::CREATED) => Self::Created,
            Some(ContainerStateStatusEnum::EXITED | ContainerStateStatusEnum::DEAD) => {
                Self::Exited {
                    exit_code: state.exit_code,
                }
            }
            _ => Self::Unknown,
        }
    }
}

impl EngineConnector {
    /// Read a log snapshot for `container_id`.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::LogsFailed` when the engine call fails.
    pub async fn container_logs_async<C: ContainerRuntimeClient>(
        client: &C,
        container_id: &str,
    ) -> Result<ContainerLogs, DindError> {
        client.fetch_logs(container_id).await.map_err(|error| {
            DindError::from(ContainerError::LogsFailed {
                container_id: String::from(container_id),
                message: error.to_string(),
            })
        })
    }

    /// Resolve the host port the engine bound to `container_port`.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::InspectFailed` when inspection fails and
    /// `ContainerError::PortNotBound` when no numeric host port is published
    /// for the port (for example before the container is running).
    pub async fn mapped_port_async<C: ContainerRuntimeClient>(
        client: &C,
        container_id: &str,
        container_port: u16,
    ) -> Result<u16, DindError> {
        let response = inspect(client, container_id).await?;
        let key = format!("{container_port}/tcp");

        response
            .network_settings
            .and_then(|settings| settings.ports)
            .and_then(|mut ports| ports.remove(&key))
            .flatten()
            .unwrap_or_default()
            .into_iter()
            .find_map(|binding| binding.host_port.and_then(|port| port.parse::<u16>().ok()))
            .filter(|port| *port != 0)
            .ok_or_else(|| {
                DindError::from(ContainerError::PortNotBound {
                    container_id: String::from(container_id),
                    port: container_port,
                })
            })
    }

    /// Query the coarse run state of `container_id`.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::InspectFailed` when inspection fails.
    pub async fn container_state_async<C: ContainerRuntimeClient>(
        client: &C,
        container_id: &str,
    ) -> Result<ContainerRunState, DindError> {
        let response = inspect(client, container_id).await?;
        Ok(ContainerRunState::from_inspect(&response))
    }

    /// Stop and remove `container_id`.
    ///
    /// Containers that are already stopped or already gone count as success,
    /// so repeated calls are harmless. A failed stop is logged and the forced
    /// remove still runs.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::RemoveFailed` when the remove call fails for
    /// any reason other than the container being gone.
    pub async fn stop_and_remove_async<C: ContainerRuntimeClient>(
        client: &C,
        container_id: &str,
    ) -> Result<(), DindError> {
        let removal_error = |error: &bollard::errors::Error| {
            DindError::from(ContainerError::RemoveFailed {
                container_id: String::from(container_id),
                message: error.to_string(),
            })
        };

        match client.stop_container(container_id).await {
            Ok(()) => {}
            Err(error) if is_already_stopped(&error) => {
                debug!(container_id, "container already stopped");
            }
            Err(error) => {
                warn!(container_id, error = %error, "stop failed; forcing removal");
            }
        }

        match client.remove_container(container_id).await {
            Ok(()) => Ok(()),
            Err(error) if is_not_found(&error) => {
                debug!(container_id, "container already removed");
                Ok(())
            }
            Err(error) => Err(removal_error(&error)),
        }
    }
}

async fn inspect<C: ContainerRuntimeClient>(
    client: &C,
    container_id: &str,
) -> Result<ContainerInspectResponse, DindError> {
    client.inspect_container(container_id).await.map_err(|error| {
        DindError::from(ContainerError::InspectFailed {
            container_id: String::from(container_id),
            message: error.to_string(),
        })
    })
}
