//! Configuration loading with layered precedence.
//!
//! Layers, lowest to highest: application defaults, configuration file,
//! `TLSDIND_*` environment variables, command-line arguments.
//!
//! Layers are pushed onto a `MergeComposer` by hand rather than through the
//! derived `OrthoConfig::load()`, because subcommand dispatch belongs to
//! [`Cli`] and typed environment values must fail loudly. Figment's
//! environment provider silently drops values it cannot parse, so
//! `TLSDIND_DIND_PRIVILEGED=maybe` would otherwise fall back to the default.

use camino::Utf8PathBuf;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use ortho_config::discovery::ConfigDiscovery;
use ortho_config::serde_json::{self, Map, Value};
use ortho_config::{MergeComposer, toml};

use crate::config::{AppConfig, Cli};
use crate::error::{ConfigError, Result};

/// The type of value expected from an environment variable.
#[derive(Clone, Copy)]
enum EnvVarType {
    /// Always accepted.
    String,
    /// `true` or `false`.
    Bool,
    /// Unsigned 64-bit integer.
    U64,
}

/// Maps one environment variable onto a JSON path in [`AppConfig`].
struct EnvVarSpec {
    env_var: &'static str,
    path: &'static [&'static str],
    var_type: EnvVarType,
}

const ENV_VAR_SPECS: &[EnvVarSpec] = &[
    EnvVarSpec {
        env_var: "TLSDIND_ENGINE_SOCKET",
        path: &["engine_socket"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "TLSDIND_IMAGE",
        path: &["image"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "TLSDIND_HOST_OVERRIDE",
        path: &["host_override"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "TLSDIND_DIND_DOCKER_VERSION",
        path: &["dind", "docker_version"],
        var_type: EnvVarType::String,
    },
    EnvVarSpec {
        env_var: "TLSDIND_DIND_PRIVILEGED",
        path: &["dind", "privileged"],
        var_type: EnvVarType::Bool,
    },
    EnvVarSpec {
        env_var: "TLSDIND_READINESS_TIMEOUT_SECS",
        path: &["readiness", "timeout_secs"],
        var_type: EnvVarType::U64,
    },
    EnvVarSpec {
        env_var: "TLSDIND_READINESS_POLL_INTERVAL_MS",
        path: &["readiness", "poll_interval_ms"],
        var_type: EnvVarType::U64,
    },
    EnvVarSpec {
        env_var: "TLSDIND_STAGING_BASE_DIR",
        path: &["staging", "base_dir"],
        var_type: EnvVarType::String,
    },
];

/// Returns the environment variable names the loader reads.
///
/// Tests use this to clear every `TLSDIND_*` variable before loading.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    ENV_VAR_SPECS.iter().map(|spec| spec.env_var).collect()
}

fn load_config_file(path: &Utf8PathBuf, composer: &mut MergeComposer) -> Result<()> {
    let current_dir = Utf8PathBuf::from(".");
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| current_dir.as_ref());
    let file_name = path.file_name().unwrap_or(path.as_str());

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to open directory {parent}: {e}"),
        }
    })?;

    let content = dir
        .read_to_string(file_name)
        .map_err(|e| ConfigError::ParseError {
            message: format!("failed to read {path}: {e}"),
        })?;

    let value =
        toml::from_str::<serde_json::Value>(&content).map_err(|e| ConfigError::ParseError {
            message: format!("failed to parse {path}: {e}"),
        })?;

    composer.push_file(value, Some(path.clone()));
    Ok(())
}

fn discover_config_file(cli: &Cli) -> Option<Utf8PathBuf> {
    cli.config.clone().filter(|p| p.exists()).or_else(|| {
        let discovery = ConfigDiscovery::builder("tlsdind")
            .env_var("TLSDIND_CONFIG_PATH")
            .config_file_name("config.toml")
            .dotfile_name(".tlsdind.toml")
            .build();
        discovery
            .candidates()
            .into_iter()
            .filter(|p| p.exists())
            .find_map(|p| Utf8PathBuf::try_from(p).ok())
    })
}

/// Load configuration from every layer, reading the process environment.
///
/// # Errors
///
/// Returns `ConfigError::ParseError` for unreadable or malformed files,
/// `ConfigError::InvalidValue` for unparseable typed environment values
/// (for example `TLSDIND_READINESS_TIMEOUT_SECS=soon`), and
/// `ConfigError::OrthoConfig` when the merged layers do not deserialize.
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    load_config_with_env(cli, &mockable::DefaultEnv::new())
}

/// Load configuration from every layer, reading `TLSDIND_*` values from `env`.
///
/// Configuration file discovery still consults the process environment for
/// `TLSDIND_CONFIG_PATH`.
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_with_env<E: mockable::Env>(cli: &Cli, env: &E) -> Result<AppConfig> {
    let mut composer = MergeComposer::new();

    let defaults =
        serde_json::to_value(AppConfig::default()).map_err(|e| ConfigError::ParseError {
            message: format!("failed to serialise defaults: {e}"),
        })?;
    composer.push_defaults(defaults);

    if let Some(ref path) = discover_config_file(cli) {
        load_config_file(path, &mut composer)?;
    }

    let env_values = collect_env_vars(env)?;
    if !env_values.is_null() {
        composer.push_environment(env_values);
    }

    let cli_overrides = build_cli_overrides(cli);
    if !cli_overrides.is_null() {
        composer.push_cli(cli_overrides);
    }

    let config =
        AppConfig::merge_from_layers(composer.layers()).map_err(ConfigError::OrthoConfig)?;

    Ok(config)
}

fn parse_env_value(spec: &EnvVarSpec, raw_value: String) -> Result<Value> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        field: spec.env_var.to_owned(),
        reason,
    };

    match spec.var_type {
        EnvVarType::String => Ok(Value::String(raw_value)),
        EnvVarType::Bool => raw_value.parse::<bool>().map(Value::Bool).map_err(|_| {
            invalid(format!("expected bool (true/false), got '{raw_value}'")).into()
        }),
        EnvVarType::U64 => raw_value
            .parse::<u64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| invalid(format!("expected unsigned integer, got '{raw_value}'")).into()),
    }
}

fn collect_env_vars<E: mockable::Env>(env: &E) -> Result<Value> {
    let mut root = Map::new();

    for spec in ENV_VAR_SPECS {
        let Some(raw_value) = env.string(spec.env_var) else {
            continue;
        };
        let json_value = parse_env_value(spec, raw_value)?;
        insert_at_path(&mut root, spec.path, json_value);
    }

    if root.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::Object(root))
    }
}

/// Insert `value` at a nested `path`, creating intermediate objects.
fn insert_at_path(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((&field, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for &segment in parents {
        let entry = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(obj) = entry.as_object_mut() else {
            return;
        };
        current = obj;
    }

    current.insert(field.to_owned(), value);
}

fn build_cli_overrides(cli: &Cli) -> serde_json::Value {
    let mut overrides = serde_json::Map::new();

    if let Some(ref socket) = cli.engine_socket {
        overrides.insert(
            "engine_socket".to_owned(),
            serde_json::Value::String(socket.clone()),
        );
    }

    if let Some(ref image) = cli.image {
        overrides.insert("image".to_owned(), serde_json::Value::String(image.clone()));
    }

    if overrides.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::Value::Object(overrides)
    }
}
