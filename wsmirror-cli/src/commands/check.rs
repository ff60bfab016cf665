//! `wsmirror check`: verify the serving directory, sync only if needed.

use anyhow::{Context, Result};
use clap::Args;

use wsmirror_core::SyncConfig;
use wsmirror_sync::RunOptions;

use super::sync::{execute, print_report};

/// Arguments for `wsmirror check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Also force items whose installed size differs from the reported size.
    #[arg(long)]
    pub check_sizes: bool,

    /// Show what would be downloaded without downloading anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CheckArgs {
    pub fn run(self, config: &SyncConfig) -> Result<()> {
        let options = RunOptions {
            check_files: true,
            check_sizes: self.check_sizes,
            exit_if_intact: true,
            dry_run: self.dry_run,
        };
        let report = execute(config, options).context("check failed")?;
        print_report(&report);
        Ok(())
    }
}
