//! Batch scheduling for the external download tool.
//!
//! `n = max(1, floor(count / divisor))` batches, filled round-robin: the id
//! at position `i` goes to batch `i mod n`. Sizes therefore differ by at
//! most one. Batches run strictly one after another.

use std::fmt;
use std::time::{Duration, Instant};

use wsmirror_core::ItemId;

/// One download tool invocation's worth of identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based position, for logs.
    pub index: usize,
    pub total: usize,
    pub ids: Vec<ItemId>,
}

/// How a single batch invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Succeeded,
    /// Non-zero exit; `code` is `None` when terminated by a signal.
    Failed { code: Option<i32> },
    TimedOut { after: Duration },
    /// The process could not be started or waited on.
    Io { reason: String },
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Succeeded)
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOutcome::Succeeded => write!(f, "succeeded"),
            BatchOutcome::Failed { code: Some(code) } => write!(f, "exited with status {code}"),
            BatchOutcome::Failed { code: None } => write!(f, "terminated by signal"),
            BatchOutcome::TimedOut { after } => write!(f, "timed out after {}s", after.as_secs()),
            BatchOutcome::Io { reason } => write!(f, "could not run: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub batch: Batch,
    pub outcome: BatchOutcome,
    pub elapsed: Duration,
}

/// The external download tool, invoked once per batch and blocking until done.
pub trait DownloadTool {
    fn run_batch(&self, batch: &Batch) -> BatchOutcome;
}

/// Number of batches for `count` ids.
pub fn batch_count(count: usize, divisor: usize) -> usize {
    (count / divisor.max(1)).max(1)
}

/// Partition `ids` round-robin into [`batch_count`] batches.
///
/// An empty input yields no batches.
pub fn partition(ids: &[ItemId], divisor: usize) -> Vec<Batch> {
    if ids.is_empty() {
        return Vec::new();
    }
    let total = batch_count(ids.len(), divisor);
    let mut groups: Vec<Vec<ItemId>> = vec![Vec::new(); total];
    for (position, id) in ids.iter().enumerate() {
        groups[position % total].push(*id);
    }
    groups
        .into_iter()
        .enumerate()
        .map(|(i, ids)| Batch {
            index: i + 1,
            total,
            ids,
        })
        .collect()
}

/// Run every batch in order, collecting one report per batch.
///
/// A failed batch is logged and does not stop the remaining ones.
pub fn run_batches(tool: &dyn DownloadTool, batches: &[Batch]) -> Vec<BatchReport> {
    let item_count: usize = batches.iter().map(|b| b.ids.len()).sum();
    tracing::info!(
        "{item_count} item(s) to download, split into {} download task(s)",
        batches.len()
    );

    let mut reports = Vec::with_capacity(batches.len());
    for batch in batches {
        tracing::info!(
            "starting download task {} of {} ({} items)",
            batch.index,
            batch.total,
            batch.ids.len()
        );
        let started = Instant::now();
        let outcome = tool.run_batch(batch);
        let elapsed = started.elapsed();
        if outcome.is_success() {
            tracing::info!("download task {} done in {}s", batch.index, elapsed.as_secs());
        } else {
            tracing::warn!("download task {} {outcome}", batch.index);
        }
        reports.push(BatchReport {
            batch: batch.clone(),
            outcome,
            elapsed,
        });
    }
    reports
}
