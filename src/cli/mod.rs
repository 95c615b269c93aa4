//! CLI adapter for Fathom
//!
//! Provides the `fathom` command line: running the server, checking a
//! configuration and one-shot repository synchronization.
//!
//! # Architecture
//!
//! ```text
//!              +------------------+
//!              |     core/        |
//!              |  (domain logic)  |
//!              +--------+---------+
//!                       |
//!          +------------+------------+
//!          |                         |
//!          v                         v
//! +------------------+      +------------------+
//! |      http/       |<-----|      cli/        |
//! |  (axum adapter)  |      | (clap adapter)   |
//! +------------------+      +------------------+
//! ```

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fathom - multi-repository code search server
///
/// Keeps working copies of many repositories in sync with their
/// upstreams and serves concurrent searches over them, with
/// per-repository access control.
#[derive(Parser, Debug)]
#[command(name = "fathom")]
#[command(version)]
#[command(about = "Multi-repository code search server", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (TOML, or JSON with a .json extension)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Whether logs should be emitted as JSON lines
    pub fn log_json(&self) -> bool {
        matches!(&self.command, Commands::Serve(args) if args.log_json)
    }
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sync all repositories and serve the search API
    Serve(commands::ServeArgs),

    /// Load, merge and validate the configuration
    #[command(name = "check-config")]
    CheckConfig(commands::CheckConfigArgs),

    /// Clone or pull repositories once and print their revisions
    Sync(commands::SyncArgs),
}

/// Run the CLI with the provided arguments
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use crate::core::config::Config;
    use crate::core::xdg::XdgDirs;

    // Initialize XDG directories
    let xdg = XdgDirs::new();
    xdg.log_paths();
    xdg.ensure_dirs_exist()?;

    // Load configuration
    let config = Config::load_with_xdg(cli.config.as_deref(), &xdg)?;

    // Execute command
    match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, config).await,
        Commands::CheckConfig(args) => {
            commands::check_config::execute(args, config, cli.format).await
        }
        Commands::Sync(args) => commands::sync::execute(args, config, cli.format).await,
    }
}
