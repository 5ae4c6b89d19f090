//! Readiness conditions for fixture containers.
//!
//! A [`WaitStrategy`] is an ordered list of [`WaitCondition`] values. The
//! container counts as ready when every condition holds. Conditions only read
//! engine state, so evaluating one repeatedly has no side effects, and a
//! failed engine query simply means "not ready yet".

use std::fmt;

use tracing::debug;

use crate::engine::{ContainerHandle, ContainerRunState, ContainerRuntimeClient};
use crate::error::{ConfigError, DindError};

pub use crate::engine::LogStream;

/// A single readiness condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// The engine reports the container as running.
    ContainerRunning,
    /// The given log stream contains `marker`.
    LogContains {
        /// The stream to search.
        stream: LogStream,
        /// The substring that signals readiness.
        marker: String,
    },
}

impl WaitCondition {
    /// Build a log-marker condition.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when `marker` is empty.
    pub fn log_contains(stream: LogStream, marker: impl Into<String>) -> Result<Self, DindError> {
        let marker_value = marker.into();
        if marker_value.is_empty() {
            return Err(DindError::from(ConfigError::MissingRequired {
                field: String::from("marker"),
            }));
        }

        Ok(Self::LogContains {
            stream,
            marker: marker_value,
        })
    }

    /// Condition met once a nested Docker daemon reports its API listening on
    /// `port`.
    ///
    /// The marker matches the daemon's own log wording (`API listen on
    /// [::]:<port>` on stderr) and may need revisiting for other daemon
    /// versions.
    #[must_use]
    pub fn docker_api_listening(port: u16) -> Self {
        Self::LogContains {
            stream: LogStream::Stderr,
            marker: format!("API listen on [::]:{port}"),
        }
    }

    /// Return whether the condition currently holds for `handle`.
    ///
    /// Engine failures are logged at debug level and count as not ready.
    pub async fn evaluate<E: ContainerRuntimeClient>(&self, handle: &ContainerHandle<E>) -> bool {
        match self {
            Self::ContainerRunning => match handle.state().await {
                Ok(state) => state == ContainerRunState::Running,
                Err(error) => {
                    debug!(container_id = handle.id(), %error, "run state not available yet");
                    false
                }
            },
            Self::LogContains { stream, marker } => match handle.logs().await {
                Ok(logs) => logs.stream(*stream).contains(marker.as_str()),
                Err(error) => {
                    debug!(container_id = handle.id(), %error, "logs not available yet");
                    false
                }
            },
        }
    }
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContainerRunning => write!(f, "container running"),
            Self::LogContains { stream, marker } => {
                let stream_name = match stream {
                    LogStream::Stdout => "stdout",
                    LogStream::Stderr => "stderr",
                };
                write!(f, "{stream_name} contains {marker:?}")
            }
        }
    }
}

/// Ordered conjunction of readiness conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitStrategy {
    conditions: Vec<WaitCondition>,
}

impl Default for WaitStrategy {
    fn default() -> Self {
        Self::for_running_container()
    }
}

impl WaitStrategy {
    /// Strategy satisfied as soon as the container is running.
    #[must_use]
    pub fn for_running_container() -> Self {
        Self {
            conditions: vec![WaitCondition::ContainerRunning],
        }
    }

    /// Strategy for a nested Docker daemon serving its API on `port`.
    #[must_use]
    pub fn for_docker_daemon(port: u16) -> Self {
        Self::for_running_container().and(WaitCondition::docker_api_listening(port))
    }

    /// Append a condition, evaluated after the existing ones.
    #[must_use]
    pub fn and(mut self, condition: WaitCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Return the conditions in evaluation order.
    #[must_use]
    pub fn conditions(&self) -> &[WaitCondition] {
        &self.conditions
    }

    /// Return whether every condition holds, stopping at the first that does
    /// not.
    pub async fn evaluate<E: ContainerRuntimeClient>(&self, handle: &ContainerHandle<E>) -> bool {
        for condition in &self.conditions {
            if !condition.evaluate(handle).await {
                debug!(container_id = handle.id(), %condition, "wait condition not met");
                return false;
            }
        }
        true
    }
}
