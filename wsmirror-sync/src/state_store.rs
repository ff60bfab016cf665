//! State store: the persisted snapshot of previously synced entries.
//!
//! Persists a `StateFile` JSON document at the configured `state_file`.
//! Writes use an atomic `.tmp` + rename so a crash mid-save leaves the
//! previous snapshot intact.
//!
//! An absent file is the normal first-run condition and loads as `None`.
//! A file that exists but fails schema validation (unknown fields, missing
//! `timestamp`, wrong types) is fatal.

use std::collections::btree_map::Entry;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use wsmirror_core::{ItemId, SavedEntry, SyncState};

use crate::error::{io_err, SyncError};

/// On-disk snapshot payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct StateFile {
    last_update_time: i64,
    /// Redundant; kept for human inspection and drift detection.
    entry_count: usize,
    workshop_entries: Vec<StateFileEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct StateFileEntry {
    id: ItemId,
    timestamp: i64,
    title: String,
    /// Absent in snapshots written before size tracking existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_size: Option<u64>,
}

/// Path of the temporary file used during an atomic save.
pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Load the snapshot at `path`.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_at(path: &Path) -> Result<Option<SyncState>, SyncError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::info!("no saved state at {}", path.display());
            return Ok(None);
        }
        Err(err) => return Err(io_err(path, err)),
    };

    let file: StateFile =
        serde_json::from_str(&contents).map_err(|e| SyncError::StateParse {
            path: path.to_path_buf(),
            source: e,
        })?;

    if file.entry_count != file.workshop_entries.len() {
        tracing::warn!(
            recorded = file.entry_count,
            actual = file.workshop_entries.len(),
            "saved state entry_count disagrees with its entries"
        );
    }

    let mut state = SyncState::new(file.last_update_time);
    for entry in file.workshop_entries {
        let saved = SavedEntry {
            timestamp: entry.timestamp,
            file_size: entry.file_size,
            title: entry.title,
        };
        match state.entries.entry(entry.id) {
            Entry::Vacant(slot) => {
                slot.insert(saved);
            }
            Entry::Occupied(mut slot) => {
                tracing::warn!(id = %entry.id, "duplicate id in saved state, keeping the later record");
                slot.insert(saved);
            }
        }
    }

    tracing::info!(
        "loaded saved state with {} entries from {}",
        state.entry_count(),
        path.display()
    );
    Ok(Some(state))
}

/// Save the snapshot atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(path: &Path, state: &SyncState) -> Result<(), SyncError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }

    let file = StateFile {
        last_update_time: state.last_update_timestamp,
        entry_count: state.entry_count(),
        workshop_entries: state
            .entries
            .iter()
            .map(|(id, saved)| StateFileEntry {
                id: *id,
                timestamp: saved.timestamp,
                title: saved.title.clone(),
                file_size: saved.file_size,
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&file)?;
    let tmp = tmp_path(path);
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    tracing::info!("saved state with {} entries", state.entry_count());
    Ok(())
}
