//! Launch specifications for fixture containers.
//!
//! A [`LaunchSpecBuilder`] accumulates image, privilege, port-binding, mount,
//! and wait-strategy settings, validating each value as it is supplied. The
//! frozen [`LaunchSpec`] it produces is what the lifecycle controller hands to
//! the container engine.

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::{ConfigError, DindError};
use crate::wait::WaitStrategy;

/// Access mode for a bind mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// The container may only read the mounted path.
    ReadOnly,
    /// The container may read and write the mounted path.
    ReadWrite,
}

impl AccessMode {
    /// Return the bind-mount suffix understood by the engine.
    #[must_use]
    pub const fn as_bind_option(self) -> &'static str {
        match self {
            Self::ReadOnly => "ro",
            Self::ReadWrite => "rw",
        }
    }
}

/// A request to publish a container port on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBindingRequest {
    container_port: u16,
    dynamic_host_port: bool,
}

impl PortBindingRequest {
    /// Return the container-internal port.
    #[must_use]
    pub const fn container_port(&self) -> u16 {
        self.container_port
    }

    /// Return whether the engine should pick a free host port.
    ///
    /// When `false`, the host port equals the container port.
    #[must_use]
    pub const fn dynamic_host_port(&self) -> bool {
        self.dynamic_host_port
    }

    /// Return the engine port key, for example `2376/tcp`.
    #[must_use]
    pub fn port_key(&self) -> String {
        format!("{}/tcp", self.container_port)
    }
}

/// A request to bind-mount a host path into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    host_path: Utf8PathBuf,
    container_path: Utf8PathBuf,
    access_mode: AccessMode,
}

impl MountRequest {
    /// Return the host-side path.
    #[must_use]
    pub fn host_path(&self) -> &Utf8Path {
        &self.host_path
    }

    /// Return the container-side path.
    #[must_use]
    pub fn container_path(&self) -> &Utf8Path {
        &self.container_path
    }

    /// Return the mount access mode.
    #[must_use]
    pub const fn access_mode(&self) -> AccessMode {
        self.access_mode
    }

    /// Render the mount as an engine bind string (`host:container:mode`).
    #[must_use]
    pub fn to_bind(&self) -> String {
        format!(
            "{}:{}:{}",
            self.host_path,
            self.container_path,
            self.access_mode.as_bind_option()
        )
    }
}

/// Frozen container launch configuration.
///
/// Instances are only produced by [`LaunchSpecBuilder::build`] and cannot be
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    image: String,
    privileged: bool,
    port_bindings: Vec<PortBindingRequest>,
    mounts: Vec<MountRequest>,
    wait_strategy: WaitStrategy,
}

impl LaunchSpec {
    /// Return the image reference.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Return whether the container runs privileged.
    #[must_use]
    pub const fn privileged(&self) -> bool {
        self.privileged
    }

    /// Return the port bindings in declaration order.
    #[must_use]
    pub fn port_bindings(&self) -> &[PortBindingRequest] {
        &self.port_bindings
    }

    /// Return the mounts in declaration order.
    #[must_use]
    pub fn mounts(&self) -> &[MountRequest] {
        &self.mounts
    }

    /// Return the readiness strategy.
    #[must_use]
    pub const fn wait_strategy(&self) -> &WaitStrategy {
        &self.wait_strategy
    }
}

/// Fluent accumulator for [`LaunchSpec`] values.
///
/// # Example
///
/// ```ignore
/// use tlsdind::launch::{AccessMode, LaunchSpecBuilder};
///
/// let spec = LaunchSpecBuilder::new()
///     .with_image("docker:24-dind")?
///     .with_privileged(true)
///     .with_port_binding(2376, true)?
///     .with_mount("/tmp/certs", "/certs", AccessMode::ReadWrite)?
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct LaunchSpecBuilder {
    image: Option<String>,
    privileged: bool,
    port_bindings: Vec<PortBindingRequest>,
    mounts: Vec<MountRequest>,
    wait_strategy: WaitStrategy,
}

impl LaunchSpecBuilder {
    /// Create an empty builder.
    ///
    /// The default wait strategy waits for the container to be running.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the image reference.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when `image` is empty or
    /// whitespace-only.
    pub fn with_image(mut self, image: impl Into<String>) -> Result<Self, DindError> {
        let image_value = image.into();
        self.image = Some(String::from(require_non_empty("image", &image_value)?));
        Ok(self)
    }

    /// Set whether the container runs privileged.
    #[must_use]
    pub const fn with_privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    /// Append a port binding request.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when `container_port` is zero.
    pub fn with_port_binding(
        mut self,
        container_port: u16,
        dynamic_host_port: bool,
    ) -> Result<Self, DindError> {
        if container_port == 0 {
            return Err(invalid_value("port", "container port must be non-zero"));
        }

        self.port_bindings.push(PortBindingRequest {
            container_port,
            dynamic_host_port,
        });
        Ok(self)
    }

    /// Append a bind-mount request.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when either path is empty, and
    /// `ConfigError::InvalidValue` when the container path is not absolute.
    pub fn with_mount(
        mut self,
        host_path: impl Into<Utf8PathBuf>,
        container_path: impl Into<Utf8PathBuf>,
        access_mode: AccessMode,
    ) -> Result<Self, DindError> {
        let host = host_path.into();
        let container = container_path.into();
        require_non_empty("mount.host_path", host.as_str())?;
        require_non_empty("mount.container_path", container.as_str())?;
        if !container.as_str().starts_with('/') {
            return Err(invalid_value(
                "mount.container_path",
                "container path must be absolute",
            ));
        }

        self.mounts.push(MountRequest {
            host_path: host,
            container_path: container,
            access_mode,
        });
        Ok(self)
    }

    /// Replace the readiness strategy.
    #[must_use]
    pub fn with_wait_strategy(mut self, wait_strategy: WaitStrategy) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }

    /// Freeze the accumulated settings into a [`LaunchSpec`].
    ///
    /// The builder is left untouched, so calling `build` again without an
    /// intervening setter yields an equal specification.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when no image was set.
    pub fn build(&self) -> Result<LaunchSpec, DindError> {
        let image = self.image.clone().ok_or_else(|| {
            DindError::from(ConfigError::MissingRequired {
                field: String::from("image"),
            })
        })?;

        Ok(LaunchSpec {
            image,
            privileged: self.privileged,
            port_bindings: self.port_bindings.clone(),
            mounts: self.mounts.clone(),
            wait_strategy: self.wait_strategy.clone(),
        })
    }
}

fn require_non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str, DindError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DindError::from(ConfigError::MissingRequired {
            field: String::from(field),
        }));
    }

    Ok(trimmed)
}

fn invalid_value(field: &str, reason: &str) -> DindError {
    DindError::from(ConfigError::InvalidValue {
        field: String::from(field),
        reason: String::from(reason),
    })
}
