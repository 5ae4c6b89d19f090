//! Ephemeral TLS-protected Docker-in-Docker daemons for integration tests.
//!
//! `tlsdind` starts a privileged `docker:<version>-dind` container on the
//! host's container engine, lets the nested daemon generate its TLS material
//! into a per-fixture staging directory, waits until the daemon's API listens
//! on port 2376, and hands back the endpoint and client credential path. On
//! teardown the container and the staging directory are removed.
//!
//! # Modules
//!
//! - [`fixture`]: The test-facing facade with setup and teardown hooks
//! - [`lifecycle`]: State machine driving one fixture, and its staging directory
//! - [`launch`]: Immutable container launch specs and their builder
//! - [`wait`]: Readiness conditions and strategies
//! - [`engine`]: Container engine connection, creation, and container handles
//! - [`config`]: Configuration system with layered precedence (CLI > env > file > defaults)
//! - [`api`]: Orchestration functions behind the CLI commands
//! - [`error`]: Semantic error types

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixture;
pub mod launch;
pub mod lifecycle;
pub mod wait;
