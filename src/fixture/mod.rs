//! TLS-protected Docker-in-Docker test fixture.
//!
//! [`DindFixture`] runs a nested Docker daemon that generates its own TLS
//! material into a per-fixture staging directory and serves its API on port
//! 2376. Once ready, the fixture exposes the endpoint and client credential
//! path a test needs to talk to that daemon.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use tlsdind::fixture::{DindFixture, FixtureSettings};
//!
//! let docker = bollard::Docker::connect_with_local_defaults()?;
//! let mut fixture = DindFixture::new(Arc::new(docker), FixtureSettings::new())?;
//! fixture.on_setup().await?;
//! let connection = fixture.connection().await?;
//! println!("{connection}");
//! fixture.on_teardown().await;
//! ```

mod settings;

use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

use crate::engine::{ContainerEngine, ContainerHandle};
use crate::error::{DindError, LifecycleError};
use crate::launch::{AccessMode, LaunchSpec, LaunchSpecBuilder};
use crate::lifecycle::{LifecycleController, LifecycleState, StagingDirectory};
use crate::wait::WaitStrategy;

pub use settings::{DEFAULT_DOCKER_VERSION, FixtureSettings};

/// Port the nested daemon serves its TLS-protected API on.
pub const TLS_PORT: u16 = 2376;

/// Container path the staging directory is mounted at.
pub const CONTAINER_CERTS_DIR: &str = "/certs";

const TCP_SCHEME: &str = "tcp";

/// How to reach the nested daemon of a ready fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    scheme: &'static str,
    host: String,
    port: u16,
    credential_path: Utf8PathBuf,
}

impl ConnectionDescriptor {
    /// Return the URI scheme, always `tcp`.
    #[must_use]
    pub const fn scheme(&self) -> &str {
        self.scheme
    }

    /// Return the host name.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Return the published host port of the daemon API.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Return the directory holding the client certificate, key, and CA.
    #[must_use]
    pub fn credential_path(&self) -> &Utf8Path {
        &self.credential_path
    }

    /// Return the endpoint URI, for example `tcp://localhost:49153`.
    #[must_use]
    pub fn endpoint(&self) -> String {
        if self.host.contains(':') {
            format!("{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            format!("{}://{}:{}", self.scheme, self.host, self.port)
        }
    }

    /// Return the `key=value` properties a Docker client configuration
    /// expects.
    #[must_use]
    pub fn custom_properties(&self) -> Vec<String> {
        vec![
            format!("docker.host={}", self.endpoint()),
            format!("docker.cert.path={}", self.credential_path),
        ]
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.endpoint())
    }
}

/// Ephemeral Docker-in-Docker daemon protected by TLS.
#[derive(Debug)]
pub struct DindFixture<E> {
    controller: LifecycleController<E>,
}

impl<E: ContainerEngine> DindFixture<E> {
    /// Prepare a fixture; nothing is allocated until [`Self::on_setup`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` variants when the settings produce an invalid
    /// launch spec, for example an empty image.
    pub fn new(engine: Arc<E>, settings: FixtureSettings) -> Result<Self, DindError> {
        let staging = StagingDirectory::generate(settings.staging_base());
        let spec = build_launch_spec(&settings, &staging)?;
        let controller = LifecycleController::new(
            engine,
            spec,
            staging,
            settings.readiness(),
            settings.host(),
        );
        Ok(Self { controller })
    }

    /// Start the nested daemon and wait until its API is listening.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`LifecycleController::start`].
    pub async fn on_setup(&mut self) -> Result<(), DindError> {
        self.controller.start().await
    }

    /// Remove the container and staging directory. Never fails.
    pub async fn on_teardown(&mut self) {
        self.controller.dispose().await;
    }

    /// Blocking form of [`Self::on_setup`] for thread-based harnesses.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::on_setup`].
    pub fn setup_blocking(&mut self, runtime: &tokio::runtime::Handle) -> Result<(), DindError> {
        runtime.block_on(self.on_setup())
    }

    /// Blocking form of [`Self::on_teardown`].
    pub fn teardown_blocking(&mut self, runtime: &tokio::runtime::Handle) {
        runtime.block_on(self.on_teardown());
    }

    /// Return the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.controller.state()
    }

    /// Return the launch spec the container is created from.
    #[must_use]
    pub const fn launch_spec(&self) -> &LaunchSpec {
        self.controller.spec()
    }

    /// Return the staging directory mounted at `/certs`.
    #[must_use]
    pub const fn staging_dir(&self) -> &StagingDirectory {
        self.controller.staging()
    }

    /// Return the container ID once the container has been started.
    #[must_use]
    pub fn container_id(&self) -> Option<&str> {
        self.controller.handle().map(ContainerHandle::id)
    }

    /// Compute the connection details of the ready daemon.
    ///
    /// The mapped port is looked up afresh on every call.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::NotReady` unless the fixture is `Ready`, and
    /// engine errors if the port lookup fails.
    pub async fn connection(&self) -> Result<ConnectionDescriptor, DindError> {
        let handle = self
            .controller
            .handle()
            .filter(|_| self.state() == LifecycleState::Ready)
            .ok_or_else(|| self.not_ready())?;

        let port = handle.mapped_port(TLS_PORT).await?;
        Ok(ConnectionDescriptor {
            scheme: TCP_SCHEME,
            host: String::from(handle.hostname()?),
            port,
            credential_path: self.credential_path()?,
        })
    }

    /// Blocking form of [`Self::connection`].
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::connection`].
    pub fn connection_blocking(
        &self,
        runtime: &tokio::runtime::Handle,
    ) -> Result<ConnectionDescriptor, DindError> {
        runtime.block_on(self.connection())
    }

    /// Return the endpoint URI `tcp://<host>:<mapped port>`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::connection`].
    pub async fn tcp_endpoint(&self) -> Result<String, DindError> {
        Ok(self.connection().await?.endpoint())
    }

    /// Return `<staging>/client`, where the daemon writes client credentials.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::NotReady` unless the fixture is `Ready`.
    pub fn credential_path(&self) -> Result<Utf8PathBuf, DindError> {
        if self.state() != LifecycleState::Ready {
            return Err(self.not_ready());
        }
        Ok(self.staging_dir().client_path())
    }

    /// Return the `docker.host` and `docker.cert.path` properties.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::connection`].
    pub async fn custom_properties(&self) -> Result<Vec<String>, DindError> {
        Ok(self.connection().await?.custom_properties())
    }

    fn not_ready(&self) -> DindError {
        DindError::from(LifecycleError::NotReady {
            state: self.state(),
        })
    }
}

fn build_launch_spec(
    settings: &FixtureSettings,
    staging: &StagingDirectory,
) -> Result<LaunchSpec, DindError> {
    LaunchSpecBuilder::new()
        .with_image(settings.image())?
        .with_privileged(settings.privileged())
        .with_port_binding(TLS_PORT, true)?
        .with_mount(staging.path(), CONTAINER_CERTS_DIR, AccessMode::ReadWrite)?
        .with_wait_strategy(WaitStrategy::for_docker_daemon(TLS_PORT))
        .build()
}
