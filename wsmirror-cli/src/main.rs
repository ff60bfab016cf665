//! wsmirror: keep a Steam Workshop mirror in sync with a server's addons directory.
//!
//! # Usage
//!
//! ```text
//! wsmirror [--config <path>] [-v] sync [--check-files] [--check-sizes] [--dry-run]
//! wsmirror [--config <path>] [-v] check [--check-sizes] [--dry-run]
//! wsmirror [--config <path>] status [--json]
//! wsmirror [--config <path>] init [--force]
//! ```

mod commands;
mod logging;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, init::InitArgs, status::StatusArgs, sync::SyncArgs};
use wsmirror_core::{config::DEFAULT_CONFIG_FILE, SyncConfig};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "wsmirror",
    version,
    about = "Mirror Steam Workshop items into a game server's addons directory",
    long_about = None,
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, short = 'c', global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Echo progress to the console, not only warnings.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch metadata, download outdated items and install them.
    Sync(SyncArgs),

    /// Verify installed files; run a sync only if something is missing.
    Check(CheckArgs),

    /// Show what is installed, without network access.
    Status(StatusArgs),

    /// Write a starter configuration and an empty identifier list.
    Init(InitArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => {
            let config = load_config(&cli.config)?;
            logging::init(&config.log_dir, cli.verbose);
            args.run(&config)
        }
        Commands::Check(args) => {
            let config = load_config(&cli.config)?;
            logging::init(&config.log_dir, cli.verbose);
            args.run(&config)
        }
        Commands::Status(args) => {
            logging::init_console(cli.verbose);
            args.run(&load_config(&cli.config)?)
        }
        Commands::Init(args) => {
            logging::init_console(cli.verbose);
            args.run(&cli.config)
        }
    }
}

fn load_config(path: &Path) -> Result<SyncConfig> {
    SyncConfig::load_at(path)
        .with_context(|| format!("failed to load config '{}'", path.display()))
}
