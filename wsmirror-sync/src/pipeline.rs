//! One sync run, start to finish.
//!
//! load state → missing-file pass (optional) → fetch metadata → size pass
//! (optional) → reconcile → batches → install → save state.
//!
//! This is the single entrypoint for both `wsmirror sync` and `wsmirror check`.

use std::collections::HashSet;

use wsmirror_core::id_list::load_id_list;
use wsmirror_core::{ItemId, SyncConfig, SyncState, WorkshopEntry};

use crate::batch::{partition, run_batches, Batch, BatchReport, DownloadTool};
use crate::error::SyncError;
use crate::installer::{install_artifacts, InstallResult};
use crate::integrity::{check_file_sizes, check_missing_files, MissingFileReport, SizeMismatch};
use crate::metadata::MetadataSource;
use crate::reconcile::{mark_outdated, reconcile, UpdatePlan};
use crate::state_store;
use crate::update_set::UpdateSet;

/// Switches for a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Force ids whose installed artifact is missing.
    pub check_files: bool,
    /// Force ids whose installed artifact size disagrees with the metadata.
    pub check_sizes: bool,
    /// Stop before any network access when the serving directory is intact.
    /// Ignored when `check_sizes` is set, since sizes need fresh metadata.
    pub exit_if_intact: bool,
    /// Plan only: no download, no install, no state write.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Check mode found every artifact in place; nothing else ran.
    Intact,
    /// The update plan was empty (state was still refreshed).
    NothingToUpdate,
    /// The plan was computed but not executed.
    DryRun,
    /// Batches ran and artifacts were installed.
    Completed,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Ids in the identifier list.
    pub requested: usize,
    /// Entries built from the metadata response.
    pub entries: Vec<WorkshopEntry>,
    /// Requested ids with no usable metadata record.
    pub without_metadata: Vec<ItemId>,
    pub missing_files: Option<MissingFileReport>,
    pub size_mismatches: Vec<SizeMismatch>,
    pub plan: UpdatePlan,
    pub planned_batches: Vec<Batch>,
    pub batches: Vec<BatchReport>,
    pub installs: Vec<InstallResult>,
    /// Number of entries written to the state file, if it was written.
    pub entries_saved: Option<usize>,
}

impl RunReport {
    fn new(requested: usize) -> Self {
        Self {
            outcome: RunOutcome::NothingToUpdate,
            requested,
            entries: Vec::new(),
            without_metadata: Vec::new(),
            missing_files: None,
            size_mismatches: Vec::new(),
            plan: UpdatePlan::default(),
            planned_batches: Vec::new(),
            batches: Vec::new(),
            installs: Vec::new(),
            entries_saved: None,
        }
    }

    pub fn failed_batches(&self) -> impl Iterator<Item = &BatchReport> {
        self.batches.iter().filter(|b| !b.outcome.is_success())
    }

    /// Planned ids that did not end up installed.
    pub fn failed_installs(&self) -> impl Iterator<Item = &InstallResult> {
        self.installs.iter().filter(|r| !r.is_installed())
    }

    pub fn installed_count(&self) -> usize {
        self.installs.iter().filter(|r| r.is_installed()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_batches().next().is_some() || self.failed_installs().next().is_some()
    }
}

/// Run the pipeline once.
///
/// Only configuration, state-file, metadata-transport and serving-directory
/// creation problems are errors. Failed batches and installs are reported.
pub fn run(
    config: &SyncConfig,
    source: &dyn MetadataSource,
    tool: &dyn DownloadTool,
    options: RunOptions,
) -> Result<RunReport, SyncError> {
    let ids = load_id_list(&config.id_list)?;
    let saved = state_store::load_at(&config.state_file)?;
    if saved.is_none() {
        tracing::info!("no saved state found, every item will be updated");
    }

    let mut report = RunReport::new(ids.len());
    let mut forced = UpdateSet::new();

    if options.check_files || options.exit_if_intact {
        let missing = check_missing_files(
            &config.serving_dir,
            &config.installed_extension,
            &ids,
            &mut forced,
        )?;
        let intact = missing.is_intact();
        report.missing_files = Some(missing);
        if options.exit_if_intact && !options.check_sizes && intact {
            tracing::info!("all {} files present, nothing to check", ids.len());
            report.outcome = RunOutcome::Intact;
            return Ok(report);
        }
    }

    if ids.is_empty() {
        tracing::warn!("identifier list {} is empty", config.id_list.display());
        return Ok(report);
    }

    let mut entries = source.fetch(&ids)?.into_entries(ids.len());
    let fetched: HashSet<ItemId> = entries.iter().map(|e| e.id).collect();
    report.without_metadata = ids.iter().copied().filter(|id| !fetched.contains(id)).collect();
    if entries.is_empty() && saved.as_ref().is_some_and(|s| !s.is_empty()) {
        return Err(SyncError::Metadata(format!(
            "no usable record among {} requested item(s), keeping saved state",
            ids.len()
        )));
    }

    if options.check_sizes {
        report.size_mismatches = check_file_sizes(
            &config.serving_dir,
            &config.installed_extension,
            &entries,
            &mut forced,
        )?;
    }

    let plan = reconcile(&entries, saved.as_ref(), forced.as_slice());
    mark_outdated(&mut entries, &plan);
    report.planned_batches = partition(plan.ids(), config.batch_divisor);
    tracing::info!("{} of {} item(s) need an update", plan.len(), entries.len());

    if options.dry_run {
        report.entries = entries;
        report.plan = plan;
        report.outcome = RunOutcome::DryRun;
        return Ok(report);
    }

    if !plan.is_empty() {
        report.batches = run_batches(tool, &report.planned_batches);
        report.installs = install_artifacts(config, plan.ids())?;
        report.outcome = RunOutcome::Completed;
    }

    let next = next_state(&entries, saved.as_ref(), &plan, &report.installs, now());
    state_store::save_at(&config.state_file, &next)?;
    tracing::info!(
        "saved state with {} entries to {}",
        next.entry_count(),
        config.state_file.display()
    );

    report.entries_saved = Some(next.entry_count());
    report.entries = entries;
    report.plan = plan;
    Ok(report)
}

/// The snapshot to persist after a run.
///
/// Entries that were current, or planned and installed, take their fresh
/// metadata. A planned entry that did not install keeps its previous record
/// if there was one, and is left out otherwise, so the next run retries it.
pub fn next_state(
    entries: &[WorkshopEntry],
    saved: Option<&SyncState>,
    plan: &UpdatePlan,
    installs: &[InstallResult],
    timestamp: i64,
) -> SyncState {
    let installed: HashSet<ItemId> = installs
        .iter()
        .filter(|r| r.is_installed())
        .map(InstallResult::id)
        .collect();

    let mut state = SyncState::new(timestamp);
    for entry in entries {
        if !plan.contains(entry.id) || installed.contains(&entry.id) {
            state.record(entry);
        } else if let Some(previous) = saved.and_then(|s| s.get(entry.id)) {
            tracing::warn!("{entry} was not installed, keeping its previous record");
            state.entries.insert(entry.id, previous.clone());
        } else {
            tracing::warn!("{entry} was not installed and will be retried next run");
        }
    }
    state
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
