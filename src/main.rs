//! `tlsdind` application entry point.
//!
//! Uses `eyre` for opaque error handling at the application boundary,
//! converting domain errors into human-readable reports.
//!
//! Configuration is loaded with layered precedence via `OrthoConfig`:
//! 1. Application defaults
//! 2. Configuration file (`~/.config/tlsdind/config.toml` or path from `TLSDIND_CONFIG_PATH`)
//! 3. Environment variables (`TLSDIND_*`)
//! 4. Command-line arguments

use clap::Parser;
use eyre::{Report, Result as EyreResult, WrapErr};
use mockable::DefaultEnv;
use tlsdind::api;
use tlsdind::config::{AppConfig, Cli, Commands, load_config};
use tracing_subscriber::EnvFilter;

/// Application entry point.
fn main() -> EyreResult<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli).map_err(Report::from)?;

    let runtime = tokio::runtime::Runtime::new().wrap_err("failed to create tokio runtime")?;
    runtime.block_on(run(&cli, &config))
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli, config: &AppConfig) -> EyreResult<()> {
    let env = DefaultEnv::new();
    match cli.command {
        Commands::Up => up(config, &env).await,
        Commands::Check => check(config, &env).await,
    }
}

/// Start a fixture, print its connection properties, and wait for Ctrl-C.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
async fn up(config: &AppConfig, env: &DefaultEnv) -> EyreResult<()> {
    let mut fixture = api::start_fixture(config, env).await.map_err(Report::from)?;

    let printed = match fixture.custom_properties().await {
        Ok(properties) => {
            for property in properties {
                println!("{property}");
            }
            tokio::signal::ctrl_c()
                .await
                .wrap_err("failed to listen for Ctrl-C")
        }
        Err(error) => Err(Report::from(error)),
    };

    fixture.on_teardown().await;
    printed
}

#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
async fn check(config: &AppConfig, env: &DefaultEnv) -> EyreResult<()> {
    let socket = api::check_engine(config, env).await.map_err(Report::from)?;
    println!("container engine at {socket} is healthy");
    Ok(())
}
