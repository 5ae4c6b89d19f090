//! Shared fixtures and helper functions for config tests.

use std::sync::Arc;

use ortho_config::MergeComposer;
use ortho_config::serde_json;
use rstest::fixture;

use crate::config::AppConfig;

/// Fixture providing an `AppConfig` parsed from a full TOML example.
#[fixture]
pub fn app_config_from_full_toml() -> AppConfig {
    let toml = r#"
        engine_socket = "tcp://docker.internal:2375"
        host_override = "docker.internal"

        [dind]
        docker_version = "25"
        privileged = false

        [readiness]
        timeout_secs = 30
        poll_interval_ms = 100

        [staging]
        base_dir = "/var/tmp/tlsdind"
    "#;

    toml::from_str(toml).expect("TOML parsing should succeed")
}

/// Helper: Creates a `MergeComposer` with the defaults layer already pushed.
pub fn create_composer_with_defaults() -> Result<MergeComposer, serde_json::Error> {
    let mut composer = MergeComposer::new();
    let defaults = serde_json::to_value(AppConfig::default())?;
    composer.push_defaults(defaults);
    Ok(composer)
}

/// Helper: Merges layers from a composer into `AppConfig`.
pub fn merge_config(composer: MergeComposer) -> Result<AppConfig, Arc<ortho_config::OrthoError>> {
    AppConfig::merge_from_layers(composer.layers())
}

/// Helper: Asserts that a config has all default values.
pub fn assert_config_has_defaults(config: &AppConfig) {
    assert!(
        config.engine_socket.is_none(),
        "engine_socket should be None"
    );
    assert!(config.image.is_none(), "image should be None");
    assert!(config.host_override.is_none(), "host_override should be None");
    assert_eq!(config.dind.docker_version, "24");
    assert!(config.dind.privileged, "dind.privileged should be true");
    assert_eq!(config.readiness.timeout_secs, 120);
    assert_eq!(config.readiness.poll_interval_ms, 250);
    assert!(
        config.staging.base_dir.is_none(),
        "staging.base_dir should be None"
    );
}
