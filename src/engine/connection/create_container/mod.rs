//! Container creation from frozen launch specifications.
//!
//! This module translates a [`LaunchSpec`] into a `Bollard` container-create
//! payload and provides the pull-create-start step of the fixture lifecycle.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use bollard::Docker;
use bollard::models::{ContainerCreateBody, ContainerCreateResponse, HostConfig, PortBinding};
use bollard::query_parameters::{CreateContainerOptions, CreateImageOptionsBuilder};
use futures_util::{TryStreamExt, future};
use tracing::{debug, info, trace, warn};

use super::EngineConnector;
use super::error_classification::is_not_found;
use super::runtime_client::{ContainerRuntimeClient, EngineFuture};
use crate::error::{ContainerError, DindError};
use crate::launch::{LaunchSpec, MountRequest, PortBindingRequest};

/// Boxed future type returned by [`ContainerCreator`] implementors.
pub type CreateContainerFuture<'a> = Pin<
    Box<dyn Future<Output = Result<ContainerCreateResponse, bollard::errors::Error>> + Send + 'a>,
>;

/// Behaviour required to create a container via a backing engine client.
///
/// This abstraction exists to keep container-creation logic testable without a
/// running daemon.
pub trait ContainerCreator {
    /// Create a container from `Bollard` options and body payload.
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> CreateContainerFuture<'_>;

    /// Succeed when `image` is present in the engine's local image store.
    fn inspect_image(&self, image: &str) -> EngineFuture<'_, ()>;

    /// Pull `image` from its registry, draining the progress stream.
    fn pull_image(&self, image: &str) -> EngineFuture<'_, ()>;
}

impl ContainerCreator for Docker {
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        config: ContainerCreateBody,
    ) -> CreateContainerFuture<'_> {
        Box::pin(async move { Self::create_container(self, options, config).await })
    }

    fn inspect_image(&self, image: &str) -> EngineFuture<'_, ()> {
        let image_owned = String::from(image);

        Box::pin(async move { Self::inspect_image(self, &image_owned).await.map(|_| ()) })
    }

    fn pull_image(&self, image: &str) -> EngineFuture<'_, ()> {
        let image_owned = String::from(image);

        Box::pin(async move {
            let options = CreateImageOptionsBuilder::default()
                .from_image(&image_owned)
                .build();
            self.create_image(Some(options), None, None)
                .try_for_each(|progress| {
                    if let Some(status) = progress.status {
                        trace!(image = %image_owned, %status, "pull progress");
                    }
                    future::ready(Ok(()))
                })
                .await
        })
    }
}

impl EngineConnector {
    /// Create a container from `spec` and start it.
    ///
    /// The image is pulled first when the engine does not have it locally. A
    /// container that was created but failed to start is removed before the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::ImagePullFailed` when a missing image cannot
    /// be pulled, `ContainerError::CreateFailed` when the engine rejects the
    /// create request and `ContainerError::StartFailed` when it rejects the
    /// start request.
    pub async fn create_and_start_async<C>(
        engine: &C,
        spec: &LaunchSpec,
    ) -> Result<String, DindError>
    where
        C: ContainerCreator + ContainerRuntimeClient,
    {
        ensure_image(engine, spec.image()).await?;

        let response = engine
            .create_container(None, build_create_body(spec))
            .await
            .map_err(|error| {
                DindError::from(ContainerError::CreateFailed {
                    message: error.to_string(),
                })
            })?;

        for warning in &response.warnings {
            warn!(container_id = %response.id, warning = %warning, "engine warning on create");
        }
        let container_id = response.id;

        if let Err(error) = engine.start_container(&container_id).await {
            if let Err(cleanup_error) = engine.remove_container(&container_id).await {
                warn!(
                    container_id = %container_id,
                    error = %cleanup_error,
                    "failed to remove container after start failure"
                );
            }
            return Err(DindError::from(ContainerError::StartFailed {
                container_id,
                message: error.to_string(),
            }));
        }

        debug!(container_id = %container_id, image = spec.image(), "container started");
        Ok(container_id)
    }

    /// Create and start a container, blocking on the supplied runtime handle.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Self::create_and_start_async`].
    pub fn create_and_start<C>(
        runtime: &tokio::runtime::Handle,
        engine: &C,
        spec: &LaunchSpec,
    ) -> Result<String, DindError>
    where
        C: ContainerCreator + ContainerRuntimeClient,
    {
        runtime.block_on(Self::create_and_start_async(engine, spec))
    }
}

async fn ensure_image<C: ContainerCreator>(engine: &C, image: &str) -> Result<(), DindError> {
    match engine.inspect_image(image).await {
        Ok(()) => {
            debug!(image, "image present locally");
            return Ok(());
        }
        Err(error) if is_not_found(&error) => {}
        Err(error) => debug!(image, %error, "image inspect failed; pulling anyway"),
    }

    info!(image, "pulling image");
    engine.pull_image(image).await.map_err(|error| {
        DindError::from(ContainerError::ImagePullFailed {
            image: String::from(image),
            message: error.to_string(),
        })
    })?;
    info!(image, "pulled image");
    Ok(())
}

fn build_create_body(spec: &LaunchSpec) -> ContainerCreateBody {
    ContainerCreateBody {
        image: Some(String::from(spec.image())),
        host_config: Some(build_host_config(spec)),
        ..ContainerCreateBody::default()
    }
}

fn build_host_config(spec: &LaunchSpec) -> HostConfig {
    let port_bindings: HashMap<String, Option<Vec<PortBinding>>> = spec
        .port_bindings()
        .iter()
        .map(|request| (request.port_key(), Some(vec![host_binding(request)])))
        .collect();
    let binds: Vec<String> = spec.mounts().iter().map(MountRequest::to_bind).collect();

    HostConfig {
        privileged: Some(spec.privileged()),
        port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
        binds: (!binds.is_empty()).then_some(binds),
        ..HostConfig::default()
    }
}

fn host_binding(request: &PortBindingRequest) -> PortBinding {
    // An empty host port asks the engine to pick a free one.
    let host_port = if request.dynamic_host_port() {
        String::new()
    } else {
        request.container_port().to_string()
    };

    PortBinding {
        host_ip: None,
        host_port: Some(host_port),
    }
}
