//! Orchestration API behind the `tlsdind` commands.
//!
//! These functions connect to the outer engine and drive fixtures. They
//! accept library-owned types, return [`crate::error::Result`], and never
//! print or exit, so embedders can call them directly.

use std::sync::Arc;

use bollard::Docker;
use tracing::info;

use crate::config::AppConfig;
use crate::engine::{ContainerEngine, EngineConnector, SocketResolver};
use crate::error::Result as DindResult;
use crate::fixture::{DindFixture, FixtureSettings};

/// Resolve the engine socket and check that the engine answers a ping.
///
/// Returns the socket that was used.
///
/// # Errors
///
/// Returns the connection and health-check errors of
/// [`EngineConnector::connect_with_fallback_and_verify_async`].
pub async fn check_engine<E: mockable::Env>(config: &AppConfig, env: &E) -> DindResult<String> {
    let resolver = SocketResolver::new(env);
    let (_docker, socket) = EngineConnector::connect_with_fallback_and_verify_async(
        config.engine_socket.as_deref(),
        &resolver,
    )
    .await?;
    info!(socket = %socket, "container engine is healthy");
    Ok(socket)
}

/// Connect to the outer engine and bring up a ready fixture.
///
/// # Errors
///
/// Returns connection errors, configuration errors from
/// [`FixtureSettings::from_app_config`], and setup errors from
/// [`DindFixture::on_setup`].
pub async fn start_fixture<E: mockable::Env>(
    config: &AppConfig,
    env: &E,
) -> DindResult<DindFixture<Docker>> {
    let resolver = SocketResolver::new(env);
    let (docker, socket) = EngineConnector::connect_with_fallback_and_verify_async(
        config.engine_socket.as_deref(),
        &resolver,
    )
    .await?;
    start_fixture_with_engine(Arc::new(docker), config, &socket).await
}

/// Bring up a ready fixture on an already connected engine.
///
/// `socket` is the endpoint `engine` was reached through; it decides the
/// fixture host unless the configuration overrides it. A fixture whose setup
/// fails is torn down before the error is returned.
///
/// # Errors
///
/// See [`start_fixture`].
pub async fn start_fixture_with_engine<C: ContainerEngine>(
    engine: Arc<C>,
    config: &AppConfig,
    socket: &str,
) -> DindResult<DindFixture<C>> {
    let settings = FixtureSettings::from_app_config(config, socket)?;
    let mut fixture = DindFixture::new(engine, settings)?;

    if let Err(error) = fixture.on_setup().await {
        fixture.on_teardown().await;
        return Err(error);
    }

    Ok(fixture)
}
