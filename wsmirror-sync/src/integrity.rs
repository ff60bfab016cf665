//! Integrity checks of the serving directory.
//!
//! Two independent passes, both feeding the forced-update set:
//! 1. Missing files: authoritative ids with no `<id>.<ext>` artifact are
//!    forced; artifacts whose id is not authoritative are reported as extra.
//! 2. Sizes: artifacts whose on-disk length differs from the reported size
//!    of their entry are forced. Entries without a reported size are skipped.
//!
//! Files whose stem is not a positive integer, or whose extension is not the
//! installed extension, are ignored without a warning. Symlinks count when
//! they resolve to a regular file.

use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use wsmirror_core::{ItemId, WorkshopEntry};

use crate::error::{io_err, SyncError};
use crate::update_set::UpdateSet;

/// Outcome of the missing-file pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingFileReport {
    /// Authoritative ids with an artifact present.
    pub found: Vec<ItemId>,
    /// Artifacts whose id is not in the authoritative list (orphans).
    pub extra: Vec<ItemId>,
    /// Authoritative ids without an artifact.
    pub missing: Vec<ItemId>,
}

impl MissingFileReport {
    pub fn has_missing(&self) -> bool {
        !self.missing.is_empty()
    }

    /// No missing and no extra artifacts.
    pub fn is_intact(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// An artifact whose on-disk length disagrees with the reported size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeMismatch {
    pub id: ItemId,
    pub expected: u64,
    pub actual: u64,
}

/// Map of installed artifacts in `serving_dir`, keyed by identifier.
///
/// A missing directory is reported as empty (everything will be missing).
pub fn scan_serving_dir(
    serving_dir: &Path,
    installed_extension: &str,
) -> Result<BTreeMap<ItemId, PathBuf>, SyncError> {
    let entries = match std::fs::read_dir(serving_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::warn!("serving directory {} does not exist", serving_dir.display());
            return Ok(BTreeMap::new());
        }
        Err(err) => return Err(io_err(serving_dir, err)),
    };

    let mut artifacts = BTreeMap::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(serving_dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(id) = artifact_id(&path, installed_extension) {
            artifacts.insert(id, path);
        }
    }
    Ok(artifacts)
}

/// Parse `<id>.<ext>` into an id; anything else is `None`.
pub fn artifact_id(path: &Path, installed_extension: &str) -> Option<ItemId> {
    let ext = path.extension()?.to_str()?;
    if ext != installed_extension {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

/// Compare the authoritative list with the serving directory.
///
/// Every missing id is appended to `forced`.
pub fn check_missing_files(
    serving_dir: &Path,
    installed_extension: &str,
    authoritative: &[ItemId],
    forced: &mut UpdateSet,
) -> Result<MissingFileReport, SyncError> {
    let artifacts = scan_serving_dir(serving_dir, installed_extension)?;
    let wanted: HashSet<ItemId> = authoritative.iter().copied().collect();

    let mut report = MissingFileReport::default();
    for id in artifacts.keys() {
        if wanted.contains(id) {
            report.found.push(*id);
        } else {
            tracing::warn!("extra file {id}.{installed_extension} in serving directory");
            report.extra.push(*id);
        }
    }

    for id in authoritative {
        if artifacts.contains_key(id) {
            continue;
        }
        tracing::warn!("missing file {id}.{installed_extension}");
        report.missing.push(*id);
        forced.insert(*id);
    }

    if report.has_missing() {
        tracing::info!(
            "{} missing file(s): {}",
            report.missing.len(),
            preview_ids(&report.missing)
        );
    }
    Ok(report)
}

/// Compare artifact sizes with reported sizes.
///
/// Every mismatching id is appended to `forced`; the set keeps it unique
/// even when the pass runs more than once.
pub fn check_file_sizes(
    serving_dir: &Path,
    installed_extension: &str,
    entries: &[WorkshopEntry],
    forced: &mut UpdateSet,
) -> Result<Vec<SizeMismatch>, SyncError> {
    let artifacts = scan_serving_dir(serving_dir, installed_extension)?;

    let mut mismatches = Vec::new();
    for entry in entries {
        let Some(expected) = entry.file_size else {
            continue;
        };
        let Some(path) = artifacts.get(&entry.id) else {
            continue;
        };
        let actual = std::fs::metadata(path).map_err(|e| io_err(path, e))?.len();
        if actual != expected {
            tracing::warn!(
                id = %entry.id,
                expected,
                actual,
                "size mismatch for {}",
                entry.title
            );
            forced.insert(entry.id);
            mismatches.push(SizeMismatch {
                id: entry.id,
                expected,
                actual,
            });
        }
    }
    Ok(mismatches)
}

/// Short human list: first three ids then `+N more`.
pub fn preview_ids(ids: &[ItemId]) -> String {
    let mut shown: Vec<String> = ids.iter().take(3).map(ItemId::to_string).collect();
    if ids.len() > shown.len() {
        shown.push(format!("+{} more", ids.len() - shown.len()));
    }
    shown.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn id(raw: u64) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    fn ids(raw: &[u64]) -> Vec<ItemId> {
        raw.iter().map(|r| id(*r)).collect()
    }

    fn serving_with(files: &[(&str, usize)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, len) in files {
            fs::write(dir.path().join(name), vec![0u8; *len]).unwrap();
        }
        dir
    }

    #[test]
    fn reports_extra_and_missing() {
        let dir = serving_with(&[("1.vpk", 1), ("2.vpk", 1), ("9.vpk", 1)]);
        let mut forced = UpdateSet::new();

        let report =
            check_missing_files(dir.path(), "vpk", &ids(&[1, 2, 3]), &mut forced).unwrap();

        assert_eq!(report.found, ids(&[1, 2]));
        assert_eq!(report.extra, ids(&[9]));
        assert_eq!(report.missing, ids(&[3]));
        assert_eq!(forced.as_slice(), ids(&[3]).as_slice());
        assert!(!report.is_intact());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_artifact_is_present() {
        let target = TempDir::new().unwrap();
        fs::write(target.path().join("real.bin"), b"data").unwrap();
        let dir = serving_with(&[]);
        std::os::unix::fs::symlink(target.path().join("real.bin"), dir.path().join("1.vpk"))
            .unwrap();
        std::os::unix::fs::symlink(target.path().join("gone.bin"), dir.path().join("2.vpk"))
            .unwrap();
        let mut forced = UpdateSet::new();

        let report = check_missing_files(dir.path(), "vpk", &ids(&[1, 2]), &mut forced).unwrap();

        assert_eq!(report.found, ids(&[1]));
        assert_eq!(report.missing, ids(&[2]));
    }

    #[test]
    fn extra_file_alone_is_not_intact() {
        let dir = serving_with(&[("1.vpk", 1), ("9.vpk", 1)]);
        let mut forced = UpdateSet::new();
        let report = check_missing_files(dir.path(), "vpk", &ids(&[1]), &mut forced).unwrap();
        assert!(!report.has_missing());
        assert!(!report.is_intact());
        assert!(forced.is_empty());
    }

    #[test]
    fn malformed_and_foreign_files_are_ignored() {
        let dir = serving_with(&[
            ("1.vpk", 1),
            ("readme.vpk", 1),
            ("addonlist.txt", 1),
            ("2.bin", 1),
            ("0.vpk", 1),
        ]);
        fs::create_dir(dir.path().join("5.vpk")).unwrap();
        let mut forced = UpdateSet::new();

        let report = check_missing_files(dir.path(), "vpk", &ids(&[1]), &mut forced).unwrap();
        assert_eq!(report.found, ids(&[1]));
        assert!(report.extra.is_empty());
        assert!(!report.has_missing());
        assert!(forced.is_empty());
    }

    #[test]
    fn missing_serving_dir_marks_everything_missing() {
        let root = TempDir::new().unwrap();
        let mut forced = UpdateSet::new();
        let report = check_missing_files(
            &root.path().join("absent"),
            "vpk",
            &ids(&[4, 5]),
            &mut forced,
        )
        .unwrap();
        assert_eq!(report.missing, ids(&[4, 5]));
        assert_eq!(forced.len(), 2);
    }

    #[test]
    fn size_mismatch_forces_id_once_even_if_checked_twice() {
        let dir = serving_with(&[("7.vpk", 900)]);
        let entries = vec![WorkshopEntry::new(id(7), "seven", 1, Some(1024))];
        let mut forced = UpdateSet::new();

        let first = check_file_sizes(dir.path(), "vpk", &entries, &mut forced).unwrap();
        let second = check_file_sizes(dir.path(), "vpk", &entries, &mut forced).unwrap();

        assert_eq!(
            first,
            vec![SizeMismatch { id: id(7), expected: 1024, actual: 900 }]
        );
        assert_eq!(second.len(), 1);
        assert_eq!(forced.as_slice(), ids(&[7]).as_slice());
    }

    #[test]
    fn unknown_size_and_absent_file_are_skipped() {
        let dir = serving_with(&[("1.vpk", 10), ("2.vpk", 10)]);
        let entries = vec![
            WorkshopEntry::new(id(1), "unknown size", 1, None),
            WorkshopEntry::new(id(2), "matching", 1, Some(10)),
            WorkshopEntry::new(id(3), "not installed", 1, Some(10)),
        ];
        let mut forced = UpdateSet::new();
        let mismatches = check_file_sizes(dir.path(), "vpk", &entries, &mut forced).unwrap();
        assert!(mismatches.is_empty());
        assert!(forced.is_empty());
    }

    #[test]
    fn preview_truncates_long_lists() {
        assert_eq!(preview_ids(&ids(&[1, 2])), "1, 2");
        assert_eq!(preview_ids(&ids(&[1, 2, 3, 4, 5])), "1, 2, 3, +2 more");
    }
}
