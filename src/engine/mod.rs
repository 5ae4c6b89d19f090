//! Container engine connection and management.
//!
//! This module provides the interface for connecting to Docker or Podman
//! container engines and for driving a single fixture container through them.
//! The socket endpoint is resolved through a priority-based fallback chain:
//!
//! 1. CLI argument (`--engine-socket`)
//! 2. `TLSDIND_ENGINE_SOCKET` environment variable
//! 3. Config file (`engine_socket` in TOML)
//! 4. `DOCKER_HOST` environment variable
//! 5. `CONTAINER_HOST` environment variable
//! 6. `PODMAN_HOST` environment variable
//! 7. Platform default (`/var/run/docker.sock` on Unix)

mod connection;
mod handle;

#[cfg(test)]
pub(crate) mod test_support;

pub use connection::{
    ContainerCreator, ContainerEngine, ContainerLogs, ContainerRunState, ContainerRuntimeClient,
    CreateContainerFuture, EngineConnector, EngineFuture, InspectContainerFuture, LogStream,
    SocketResolver,
};
pub use handle::ContainerHandle;
