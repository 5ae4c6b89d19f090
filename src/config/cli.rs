//! Command-line argument definitions for tlsdind.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Command-line interface for tlsdind.
#[derive(Debug, Parser)]
#[command(name = "tlsdind")]
#[command(
    author,
    version,
    about = "Ephemeral TLS-protected Docker-in-Docker daemons for tests"
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Container engine socket path or URL.
    #[arg(long, global = true)]
    pub engine_socket: Option<String>,

    /// Nested daemon image to use.
    #[arg(long, global = true)]
    pub image: Option<String>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a fixture, print its connection properties, and tear it down on
    /// Ctrl-C.
    Up,

    /// Check that the container engine answers.
    Check,
}
