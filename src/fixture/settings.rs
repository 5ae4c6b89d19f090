//! Fixture settings and their derivation from application configuration.

use std::time::Duration;

use camino::Utf8PathBuf;

use crate::config::AppConfig;
use crate::engine::EngineConnector;
use crate::error::{ConfigError, DindError};
use crate::lifecycle::ReadinessPolicy;

/// Docker release whose `-dind` image is used when no image is configured.
pub const DEFAULT_DOCKER_VERSION: &str = "24";

/// Everything a [`super::DindFixture`] needs before it is set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSettings {
    image: String,
    privileged: bool,
    host: String,
    staging_base: Utf8PathBuf,
    readiness: ReadinessPolicy,
}

impl Default for FixtureSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureSettings {
    /// Settings for `docker:24-dind`, privileged, reachable on `localhost`,
    /// staged under the system temp directory.
    ///
    /// A temp directory whose path is not UTF-8 falls back to `/tmp`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            image: dind_image(DEFAULT_DOCKER_VERSION),
            privileged: true,
            host: String::from("localhost"),
            staging_base: default_staging_base().unwrap_or_else(|_| Utf8PathBuf::from("/tmp")),
            readiness: ReadinessPolicy::default(),
        }
    }

    /// Derive settings from loaded configuration.
    ///
    /// `socket` is the resolved engine socket; its host part becomes the
    /// fixture host unless `host_override` is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when the readiness durations are
    /// zero or the system temp directory is not valid UTF-8.
    pub fn from_app_config(config: &AppConfig, socket: &str) -> Result<Self, DindError> {
        let image = config
            .image
            .clone()
            .unwrap_or_else(|| dind_image(&config.dind.docker_version));
        let host = config
            .host_override
            .clone()
            .unwrap_or_else(|| EngineConnector::endpoint_host(socket));
        let staging_base = match config.staging.base_dir.clone() {
            Some(base) => base,
            None => default_staging_base()?,
        };
        let readiness = ReadinessPolicy::new(
            Duration::from_secs(config.readiness.timeout_secs),
            Duration::from_millis(config.readiness.poll_interval_ms),
        )?;

        Ok(Self {
            image,
            privileged: config.dind.privileged,
            host,
            staging_base,
            readiness,
        })
    }

    /// Replace the container image.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Set whether the container runs privileged.
    #[must_use]
    pub const fn with_privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    /// Set the host name published ports are reachable under.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the directory per-fixture staging roots are created under.
    #[must_use]
    pub fn with_staging_base(mut self, base: impl Into<Utf8PathBuf>) -> Self {
        self.staging_base = base.into();
        self
    }

    /// Replace the readiness timing.
    #[must_use]
    pub const fn with_readiness(mut self, readiness: ReadinessPolicy) -> Self {
        self.readiness = readiness;
        self
    }

    /// Return the container image.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Return whether the container runs privileged.
    #[must_use]
    pub const fn privileged(&self) -> bool {
        self.privileged
    }

    /// Return the fixture host name.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Return the staging base directory.
    #[must_use]
    pub fn staging_base(&self) -> Utf8PathBuf {
        self.staging_base.clone()
    }

    /// Return the readiness timing.
    #[must_use]
    pub const fn readiness(&self) -> ReadinessPolicy {
        self.readiness
    }
}

fn dind_image(version: &str) -> String {
    format!("docker:{version}-dind")
}

fn default_staging_base() -> Result<Utf8PathBuf, DindError> {
    Utf8PathBuf::from_path_buf(std::env::temp_dir()).map_err(|path| {
        DindError::from(ConfigError::InvalidValue {
            field: String::from("staging.base_dir"),
            reason: format!("temp directory {} is not valid UTF-8", path.display()),
        })
    })
}
