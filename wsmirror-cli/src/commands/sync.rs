//! `wsmirror sync`: fetch metadata, download outdated items, install them.

use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use wsmirror_core::{ItemId, SyncConfig};
use wsmirror_sync::{
    InstallResult, RunOptions, RunOutcome, RunReport, SteamCmd, SteamWebApi, SyncError,
    UpdateReason,
};

use super::format_timestamp;

/// Arguments for `wsmirror sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Force items whose installed file is missing from the serving directory.
    #[arg(long)]
    pub check_files: bool,

    /// Force items whose installed size differs from the reported size.
    #[arg(long)]
    pub check_sizes: bool,

    /// Show what would be downloaded without downloading anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub fn run(self, config: &SyncConfig) -> Result<()> {
        let options = RunOptions {
            check_files: self.check_files,
            check_sizes: self.check_sizes,
            exit_if_intact: false,
            dry_run: self.dry_run,
        };
        let report = execute(config, options).context("sync failed")?;
        print_report(&report);
        Ok(())
    }
}

/// Run the pipeline against Steam.
pub(crate) fn execute(config: &SyncConfig, options: RunOptions) -> Result<RunReport, SyncError> {
    let source = SteamWebApi::from_config(config);
    let tool = SteamCmd::from_config(config);
    wsmirror_sync::run(config, &source, &tool, options)
}

pub(crate) fn print_report(report: &RunReport) {
    let titles: HashMap<ItemId, &str> = report
        .entries
        .iter()
        .map(|e| (e.id, e.title.as_str()))
        .collect();
    let title_of = |id: &ItemId| titles.get(id).copied().unwrap_or("?");

    match report.outcome {
        RunOutcome::Intact => {
            println!("✓ All {} files present", report.requested);
            return;
        }
        RunOutcome::NothingToUpdate if report.requested == 0 => {
            println!("✓ Identifier list is empty, nothing to do");
            return;
        }
        RunOutcome::NothingToUpdate => {
            println!("✓ All {} items up to date", report.entries.len());
        }
        RunOutcome::DryRun => {
            println!(
                "[dry-run] {} of {} items would be downloaded in {} batch(es)",
                report.plan.len(),
                report.entries.len(),
                report.planned_batches.len()
            );
            for update in report.plan.updates() {
                println!(
                    "  ~  {} {} ({})",
                    update.id,
                    title_of(&update.id),
                    describe_reason(&update.reason)
                );
            }
        }
        RunOutcome::Completed => {
            println!(
                "✓ {} of {} planned items installed ({} batch(es))",
                report.installed_count(),
                report.plan.len(),
                report.batches.len()
            );
            for install in &report.installs {
                match install {
                    InstallResult::Installed { id, path } => {
                        println!("  ✎  {id} {} → {}", title_of(id), path.display())
                    }
                    InstallResult::NoArtifact { id } => println!(
                        "  {}  {id} {}: no downloaded file",
                        "✗".red(),
                        title_of(id)
                    ),
                    InstallResult::Failed { id, error } => {
                        println!("  {}  {id} {}: {error}", "✗".red(), title_of(id))
                    }
                }
            }
        }
    }

    print_findings(report);
}

fn print_findings(report: &RunReport) {
    let warn = "!".yellow();

    if let Some(files) = &report.missing_files {
        if !files.missing.is_empty() {
            println!("{warn} {} missing file(s): {}", files.missing.len(), join(&files.missing));
        }
        if !files.extra.is_empty() {
            println!("{warn} {} extra file(s): {}", files.extra.len(), join(&files.extra));
        }
    }
    for mismatch in &report.size_mismatches {
        println!(
            "{warn} {} has {} bytes, expected {}",
            mismatch.id, mismatch.actual, mismatch.expected
        );
    }
    if !report.without_metadata.is_empty() {
        println!(
            "{warn} no metadata for {} item(s): {}",
            report.without_metadata.len(),
            join(&report.without_metadata)
        );
    }
    for failed in report.failed_batches() {
        println!(
            "{} download batch {}/{} {}",
            "✗".red(),
            failed.batch.index,
            failed.batch.total,
            failed.outcome
        );
    }
    if let Some(saved) = report.entries_saved {
        println!("  ·  state saved ({saved} entries)");
    }
}

fn describe_reason(reason: &UpdateReason) -> String {
    match reason {
        UpdateReason::NoPriorState => "no saved state".to_string(),
        UpdateReason::Newer { saved, remote } => format!(
            "updated {} → {}",
            format_timestamp(*saved),
            format_timestamp(*remote)
        ),
        UpdateReason::New => "new".to_string(),
        UpdateReason::Forced => "forced by integrity check".to_string(),
    }
}

fn join(ids: &[ItemId]) -> String {
    ids.iter().map(ItemId::to_string).collect::<Vec<_>>().join(", ")
}
