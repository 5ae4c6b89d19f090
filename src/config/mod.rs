//! Configuration system for tlsdind.
//!
//! Configuration is merged by `ortho_config` with the precedence
//! defaults < configuration file < `TLSDIND_*` environment < CLI flags. The
//! file is looked up at `~/.config/tlsdind/config.toml` by default.
//!
//! # Example Configuration
//!
//! ```toml
//! engine_socket = "unix:///var/run/docker.sock"
//!
//! [dind]
//! docker_version = "24"
//! privileged = true
//!
//! [readiness]
//! timeout_secs = 120
//! poll_interval_ms = 250
//!
//! [staging]
//! base_dir = "/var/tmp/tlsdind"
//! ```

mod cli;
mod loader;
mod types;

#[cfg(test)]
mod tests;

pub use cli::{Cli, Commands};
pub use loader::{env_var_names, load_config, load_config_with_env};
pub use types::{AppConfig, DindConfig, ReadinessConfig, StagingConfig};
