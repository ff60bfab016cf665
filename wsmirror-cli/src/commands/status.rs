//! `wsmirror status`: offline view of the mirror.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use wsmirror_core::{id_list::load_id_list, ItemId, SyncConfig, SyncState};
use wsmirror_sync::{integrity::scan_serving_dir, state_store};

use super::format_timestamp;

/// Arguments for `wsmirror status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, config: &SyncConfig) -> Result<()> {
        let ids = load_id_list(&config.id_list).context("failed to load identifier list")?;
        let state = state_store::load_at(&config.state_file).context("failed to load state")?;
        let artifacts = scan_serving_dir(&config.serving_dir, &config.installed_extension)
            .context("failed to scan serving directory")?;

        let report = build_report(&ids, state.as_ref(), |id| artifacts.contains_key(&id));
        let orphans: Vec<ItemId> = artifacts
            .keys()
            .filter(|id| !ids.contains(id))
            .copied()
            .collect();

        if self.json {
            print_json(report, orphans)?;
        } else {
            print_table(report, &orphans, config);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemState {
    Installed,
    MissingFile,
    NeverSynced,
}

#[derive(Debug, Clone)]
struct ItemStatus {
    id: ItemId,
    title: String,
    timestamp: Option<i64>,
    file_size: Option<u64>,
    state: ItemState,
}

#[derive(Debug, Clone)]
struct StatusReport {
    last_update: Option<i64>,
    items: Vec<ItemStatus>,
}

impl StatusReport {
    fn count(&self, state: ItemState) -> usize {
        self.items.iter().filter(|i| i.state == state).count()
    }
}

#[derive(Serialize)]
struct StatusReportJson {
    summary: StatusSummaryJson,
    items: Vec<ItemStatusJson>,
    orphans: Vec<u64>,
}

#[derive(Serialize)]
struct StatusSummaryJson {
    items: usize,
    installed: usize,
    missing_file: usize,
    never_synced: usize,
    orphans: usize,
    last_update_time: Option<i64>,
}

#[derive(Serialize)]
struct ItemStatusJson {
    id: u64,
    title: String,
    status: &'static str,
    timestamp: Option<i64>,
    file_size: Option<u64>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "id")]
    id: u64,
    #[tabled(rename = "title")]
    title: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "updated")]
    updated: String,
}

fn build_report(
    ids: &[ItemId],
    state: Option<&SyncState>,
    installed: impl Fn(ItemId) -> bool,
) -> StatusReport {
    let items = ids
        .iter()
        .map(|id| {
            let saved = state.and_then(|s| s.get(*id));
            let item_state = match (saved, installed(*id)) {
                (None, _) => ItemState::NeverSynced,
                (Some(_), false) => ItemState::MissingFile,
                (Some(_), true) => ItemState::Installed,
            };
            ItemStatus {
                id: *id,
                title: saved.map(|s| s.title.clone()).unwrap_or_default(),
                timestamp: saved.map(|s| s.timestamp),
                file_size: saved.and_then(|s| s.file_size),
                state: item_state,
            }
        })
        .collect();

    StatusReport {
        last_update: state.map(|s| s.last_update_timestamp),
        items,
    }
}

fn print_json(report: StatusReport, orphans: Vec<ItemId>) -> Result<()> {
    let payload = StatusReportJson {
        summary: StatusSummaryJson {
            items: report.items.len(),
            installed: report.count(ItemState::Installed),
            missing_file: report.count(ItemState::MissingFile),
            never_synced: report.count(ItemState::NeverSynced),
            orphans: orphans.len(),
            last_update_time: report.last_update,
        },
        items: report
            .items
            .into_iter()
            .map(|item| ItemStatusJson {
                id: item.id.get(),
                title: item.title,
                status: state_key(item.state),
                timestamp: item.timestamp,
                file_size: item.file_size,
            })
            .collect(),
        orphans: orphans.into_iter().map(ItemId::get).collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(report: StatusReport, orphans: &[ItemId], config: &SyncConfig) {
    let last_run = report
        .last_update
        .map(format_timestamp)
        .unwrap_or_else(|| "never".to_string());
    println!(
        "wsmirror v{} | {} items | {} installed | {} missing | last run {}",
        env!("CARGO_PKG_VERSION"),
        report.items.len(),
        report.count(ItemState::Installed),
        report.count(ItemState::MissingFile) + report.count(ItemState::NeverSynced),
        last_run,
    );

    if report.items.is_empty() {
        println!("No items in {}.", config.id_list.display());
    } else {
        let separator = "■".repeat(67).bright_black().to_string();
        println!("{separator}");
        println!(
            "Indicators: {} INSTALLED  {} MISSING FILE  {} NEVER SYNCED",
            state_indicator(ItemState::Installed),
            state_indicator(ItemState::MissingFile),
            state_indicator(ItemState::NeverSynced),
        );
        println!("{separator}");

        let needs_sync = report.items.iter().any(|i| i.state != ItemState::Installed);
        let rows: Vec<StatusTableRow> = report
            .items
            .into_iter()
            .map(|item| StatusTableRow {
                id: item.id.get(),
                title: item.title,
                status: state_label(item.state).to_string(),
                updated: item
                    .timestamp
                    .map(format_timestamp)
                    .unwrap_or_else(|| "-".to_string()),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");

        if needs_sync {
            println!("Run 'wsmirror check' to fetch missing items.");
        }
    }

    if !orphans.is_empty() {
        let names: Vec<String> = orphans
            .iter()
            .map(|id| config.installed_file_name(*id))
            .collect();
        println!(
            "{} {} orphan file(s) not in the identifier list: {}",
            "■".magenta().bold(),
            orphans.len(),
            names.join(", ")
        );
    }
}

fn state_key(state: ItemState) -> &'static str {
    match state {
        ItemState::Installed => "installed",
        ItemState::MissingFile => "missing_file",
        ItemState::NeverSynced => "never_synced",
    }
}

fn state_label(state: ItemState) -> &'static str {
    match state {
        ItemState::Installed => "INSTALLED",
        ItemState::MissingFile => "MISSING FILE",
        ItemState::NeverSynced => "NEVER SYNCED",
    }
}

fn state_indicator(state: ItemState) -> String {
    match state {
        ItemState::Installed => "■".green().bold().to_string(),
        ItemState::MissingFile => "■".red().bold().to_string(),
        ItemState::NeverSynced => "■".bright_black().bold().to_string(),
    }
}
