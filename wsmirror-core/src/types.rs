//! Domain types for the workshop mirror.
//!
//! [`WorkshopEntry`] is rebuilt from the metadata source on every run.
//! [`SyncState`] is the persisted snapshot of what the last successful run
//! installed; it is the ground truth for "already correctly installed".

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of a remote workshop item. Always strictly positive.
///
/// The identifier is both the metadata key and the installed file stem
/// (`<id>.<ext>`) in the serving directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ItemId(u64);

impl ItemId {
    /// Build an identifier, rejecting zero.
    pub fn new(raw: u64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Raised when text or a number does not form a valid [`ItemId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid workshop item id \"{0}\"")]
pub struct ParseItemIdError(pub String);

impl TryFrom<u64> for ItemId {
    type Error = ParseItemIdError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or_else(|| ParseItemIdError(raw.to_string()))
    }
}

impl From<ItemId> for u64 {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl FromStr for ItemId {
    type Err = ParseItemIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .parse::<u64>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| ParseItemIdError(trimmed.to_owned()))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Remote entry
// ---------------------------------------------------------------------------

/// One remote item as reported by the metadata source for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkshopEntry {
    pub id: ItemId,
    /// Display name; only used for logs and the status view.
    pub title: String,
    /// Last-modified revision marker (Unix seconds).
    pub timestamp: i64,
    /// Reported artifact size in bytes; `None` when the source did not report one.
    pub file_size: Option<u64>,
    /// Starts `true`; cleared once reconciliation proves the local copy current.
    pub outdated: bool,
}

impl WorkshopEntry {
    pub fn new(id: ItemId, title: impl Into<String>, timestamp: i64, file_size: Option<u64>) -> Self {
        Self {
            id,
            title: title.into(),
            timestamp,
            file_size,
            outdated: true,
        }
    }

    pub fn needs_update(&self) -> bool {
        self.outdated
    }
}

impl fmt::Display for WorkshopEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.id)
    }
}

// ---------------------------------------------------------------------------
// Persisted snapshot
// ---------------------------------------------------------------------------

/// What the snapshot remembers about one installed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedEntry {
    pub timestamp: i64,
    pub file_size: Option<u64>,
    pub title: String,
}

impl From<&WorkshopEntry> for SavedEntry {
    fn from(entry: &WorkshopEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            file_size: entry.file_size,
            title: entry.title.clone(),
        }
    }
}

/// Snapshot of entries confirmed synced as of `last_update_timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncState {
    /// Unix seconds at which this snapshot was written.
    pub last_update_timestamp: i64,
    pub entries: BTreeMap<ItemId, SavedEntry>,
}

impl SyncState {
    pub fn new(last_update_timestamp: i64) -> Self {
        Self {
            last_update_timestamp,
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, id: ItemId) -> Option<&SavedEntry> {
        self.entries.get(&id)
    }

    /// Record `entry` as synced, replacing any previous record for its id.
    pub fn record(&mut self, entry: &WorkshopEntry) {
        self.entries.insert(entry.id, SavedEntry::from(entry));
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> ItemId {
        ItemId::new(raw).expect("positive id")
    }

    #[test]
    fn item_id_rejects_zero_and_garbage() {
        assert!(ItemId::new(0).is_none());
        assert!("0".parse::<ItemId>().is_err());
        assert!("-4".parse::<ItemId>().is_err());
        assert!("12a".parse::<ItemId>().is_err());
        assert_eq!(" 42 ".parse::<ItemId>().unwrap(), id(42));
    }

    #[test]
    fn item_id_serde_is_a_bare_number() {
        let text = yaml_scalar(id(123));
        assert_eq!(text, "123");
        let err = serde_yaml::from_str::<ItemId>("0").unwrap_err();
        assert!(err.to_string().contains("invalid workshop item id"));
    }

    fn yaml_scalar(id: ItemId) -> String {
        serde_yaml::to_string(&id).unwrap().trim().to_string()
    }

    #[test]
    fn new_entry_starts_outdated() {
        let entry = WorkshopEntry::new(id(7), "Map Pack", 1_700_000_000, Some(10));
        assert!(entry.needs_update());
        assert_eq!(entry.to_string(), "Map Pack (7)");
    }

    #[test]
    fn record_replaces_previous_snapshot_entry() {
        let mut state = SyncState::new(0);
        state.record(&WorkshopEntry::new(id(1), "a", 10, None));
        state.record(&WorkshopEntry::new(id(1), "a v2", 20, Some(5)));
        assert_eq!(state.entry_count(), 1);
        let saved = state.get(id(1)).unwrap();
        assert_eq!(saved.timestamp, 20);
        assert_eq!(saved.file_size, Some(5));
        assert_eq!(saved.title, "a v2");
    }
}
