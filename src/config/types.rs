//! Configuration data types for tlsdind.

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoResult, PostMergeContext, PostMergeHook};
use serde::{Deserialize, Serialize};

use crate::fixture::DEFAULT_DOCKER_VERSION;

/// Nested daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DindConfig {
    /// Docker release; the image used is `docker:<version>-dind`.
    pub docker_version: String,

    /// Run the nested daemon privileged. The stock image refuses to start
    /// without it.
    pub privileged: bool,
}

impl Default for DindConfig {
    fn default() -> Self {
        Self {
            docker_version: String::from(DEFAULT_DOCKER_VERSION),
            privileged: true,
        }
    }
}

/// Readiness wait configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Overall readiness budget in seconds.
    pub timeout_secs: u64,

    /// Delay between readiness evaluations in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            poll_interval_ms: 250,
        }
    }
}

/// Staging directory configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Directory per-fixture staging roots are created under. Defaults to
    /// the system temp directory.
    pub base_dir: Option<Utf8PathBuf>,
}

/// Root application configuration.
///
/// Loaded from defaults, a configuration file, `TLSDIND_*` environment
/// variables, and command-line arguments, in increasing precedence.
///
/// Configuration files are discovered in this order:
/// 1. Path specified via `TLSDIND_CONFIG_PATH`
/// 2. `.tlsdind.toml` in the current working directory
/// 3. `.tlsdind.toml` in the home directory
/// 4. `~/.config/tlsdind/config.toml` (XDG default)
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "TLSDIND",
    post_merge_hook,
    discovery(
        app_name = "tlsdind",
        env_var = "TLSDIND_CONFIG_PATH",
        config_file_name = "config.toml",
        dotfile_name = ".tlsdind.toml",
        config_cli_long = "config",
        config_cli_visible = true,
    )
)]
pub struct AppConfig {
    /// The outer container engine socket path or URL.
    pub engine_socket: Option<String>,

    /// Full image reference; overrides `dind.docker_version`.
    pub image: Option<String>,

    /// Host name published fixture ports are reachable under.
    pub host_override: Option<String>,

    /// Nested daemon configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub dind: DindConfig,

    /// Readiness wait configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub readiness: ReadinessConfig,

    /// Staging directory configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub staging: StagingConfig,
}

impl PostMergeHook for AppConfig {
    fn post_merge(&mut self, _ctx: &PostMergeContext) -> OrthoResult<()> {
        // Blank strings from the environment mean "unset".
        for field in [&mut self.engine_socket, &mut self.image, &mut self.host_override] {
            if field.as_deref().is_some_and(|value| value.trim().is_empty()) {
                *field = None;
            }
        }
        Ok(())
    }
}
