//! Socket resolution and container engine connection.
//!
//! This module resolves the container engine endpoint from configuration,
//! environment variables, or platform defaults, connects to it using the
//! Bollard library, and derives the host name under which containers started
//! through that engine are reachable.

mod create_container;
mod error_classification;
mod health_check;
mod runtime_client;

use bollard::Docker;

use crate::error::{ContainerError, DindError};

pub use create_container::{ContainerCreator, CreateContainerFuture};
pub use runtime_client::{
    ContainerEngine, ContainerLogs, ContainerRunState, ContainerRuntimeClient, EngineFuture,
    InspectContainerFuture, LogStream,
};

/// Environment variable names checked in fallback order after configuration sources.
const FALLBACK_ENV_VARS: &[&str] = &["DOCKER_HOST", "CONTAINER_HOST", "PODMAN_HOST"];

/// Connection timeout in seconds for Docker/Podman API connections.
const CONNECTION_TIMEOUT_SECS: u64 = 120;

/// Timeout in seconds for health check operations.
const HEALTH_CHECK_TIMEOUT_SECS: u64 = 10;

/// Host name used when the engine is reached through a local socket.
const LOCAL_HOST: &str = "localhost";

/// Default socket path for Unix platforms.
#[cfg(unix)]
const DEFAULT_SOCKET: &str = "unix:///var/run/docker.sock";

/// Default socket path for Windows platforms.
#[cfg(windows)]
const DEFAULT_SOCKET: &str = "npipe:////./pipe/docker_engine";

/// Resolves container engine socket endpoints from environment variables.
///
/// The resolver checks a prioritised list of environment variables to find
/// the socket endpoint when no explicit configuration is provided.
///
/// # Type Parameters
///
/// * `E` - An environment provider implementing the `mockable::Env` trait,
///   allowing for testable environment variable access.
pub struct SocketResolver<'a, E: mockable::Env> {
    env: &'a E,
}

impl<'a, E: mockable::Env> SocketResolver<'a, E> {
    /// Creates a new socket resolver with the given environment provider.
    #[must_use]
    pub const fn new(env: &'a E) -> Self {
        Self { env }
    }

    /// Resolves the socket endpoint from fallback environment variables.
    ///
    /// Checks `DOCKER_HOST`, `CONTAINER_HOST`, then `PODMAN_HOST`. Returns
    /// `None` if no fallback variable is set or all are empty.
    #[must_use]
    pub fn resolve_from_env(&self) -> Option<String> {
        FALLBACK_ENV_VARS
            .iter()
            .filter_map(|var_name| self.env.string(var_name))
            .find(|value| !value.is_empty())
    }

    /// Returns the platform default socket path.
    #[must_use]
    pub const fn default_socket() -> &'static str {
        DEFAULT_SOCKET
    }
}

/// Classifies socket endpoint types for connection handling.
enum SocketType {
    /// Unix socket or Windows named pipe with explicit scheme.
    Socket,
    /// HTTP, HTTPS, or TCP endpoint (TCP is rewritten to HTTP).
    Http,
    /// Bare path without scheme prefix.
    BarePath,
}

impl SocketType {
    fn is_socket_scheme(socket: &str) -> bool {
        socket.starts_with("unix://") || socket.starts_with("npipe://")
    }

    fn is_http_scheme(socket: &str) -> bool {
        socket.starts_with("tcp://")
            || socket.starts_with("http://")
            || socket.starts_with("https://")
    }

    fn classify(socket: &str) -> Self {
        match (Self::is_socket_scheme(socket), Self::is_http_scheme(socket)) {
            (true, _) => Self::Socket,
            (_, true) => Self::Http,
            _ => Self::BarePath,
        }
    }
}

/// Provides methods to connect to Docker or Podman container engines.
///
/// The connector supports Unix sockets, Windows named pipes, TCP, HTTP, and
/// HTTPS endpoints. Container operations used by the fixture lifecycle are
/// implemented on this type in the submodules.
pub struct EngineConnector;

impl EngineConnector {
    /// Connect to the container engine at the specified socket path.
    ///
    /// Supports `unix://`, `npipe://`, `tcp://` (treated as HTTP), `http://`,
    /// and `https://` endpoints. Bare paths starting with `\\` or `//` are
    /// treated as named pipes; all other bare paths as Unix sockets.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::ConnectionFailed` if the connection cannot be
    /// established.
    pub fn connect(socket: &str) -> Result<Docker, DindError> {
        let docker = match SocketType::classify(socket) {
            SocketType::Socket => Docker::connect_with_socket(
                socket,
                CONNECTION_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
            SocketType::Http => {
                // Bollard only understands http:// for plain TCP endpoints.
                let http_socket = if socket.starts_with("tcp://") {
                    socket.replacen("tcp://", "http://", 1)
                } else {
                    socket.to_owned()
                };
                Docker::connect_with_http(
                    &http_socket,
                    CONNECTION_TIMEOUT_SECS,
                    bollard::API_DEFAULT_VERSION,
                )
            }
            SocketType::BarePath => Docker::connect_with_socket(
                &Self::normalize_bare_path(socket),
                CONNECTION_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
        }
        .map_err(|e| {
            DindError::from(ContainerError::ConnectionFailed {
                message: e.to_string(),
            })
        })?;

        Ok(docker)
    }

    fn normalize_bare_path(path: &str) -> String {
        if path.starts_with("\\\\") || path.starts_with("//") {
            format!("npipe://{path}")
        } else {
            format!("unix://{path}")
        }
    }

    /// Connect using the resolved socket from configuration and environment.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::ConnectionFailed` if the connection cannot be
    /// established.
    pub fn connect_with_fallback<E: mockable::Env>(
        config_socket: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> Result<Docker, DindError> {
        let socket = Self::resolve_socket(config_socket, resolver);
        Self::connect(&socket)
    }

    /// Resolves the socket endpoint without establishing a connection.
    ///
    /// Resolution order:
    /// 1. `config_socket` (from CLI, config file, or `TLSDIND_ENGINE_SOCKET`)
    /// 2. `DOCKER_HOST`, `CONTAINER_HOST`, `PODMAN_HOST` (via resolver)
    /// 3. Platform default socket
    #[must_use]
    pub fn resolve_socket<E: mockable::Env>(
        config_socket: Option<&str>,
        resolver: &SocketResolver<'_, E>,
    ) -> String {
        config_socket
            .filter(|s| !s.is_empty())
            .map(String::from)
            .or_else(|| resolver.resolve_from_env())
            .unwrap_or_else(|| SocketResolver::<E>::default_socket().to_owned())
    }

    /// Derive the host under which published container ports are reachable.
    ///
    /// For TCP, HTTP, and HTTPS endpoints this is the endpoint's host part;
    /// for local sockets and named pipes it is `localhost`.
    #[must_use]
    pub fn endpoint_host(socket: &str) -> String {
        let SocketType::Http = SocketType::classify(socket) else {
            return String::from(LOCAL_HOST);
        };

        let authority = socket
            .split_once("://")
            .map_or(socket, |(_, rest)| rest)
            .split('/')
            .next()
            .unwrap_or_default();

        let host = if authority.starts_with('[') {
            // Bracketed IPv6 literal.
            authority
                .split_once(']')
                .map_or(authority, |(address, _)| address)
                .trim_start_matches('[')
        } else {
            authority
                .rsplit_once(':')
                .map_or(authority, |(name, _)| name)
        };

        if host.is_empty() {
            String::from(LOCAL_HOST)
        } else {
            String::from(host)
        }
    }
}
