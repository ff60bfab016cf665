//! Relocation of downloaded artifacts into the serving directory.
//!
//! The download tool leaves each item under `<content>/<app>/<id>/`. Every
//! file there carrying the raw extension is renamed in place to
//! `<id>.<installed_ext>` and then moved into the serving directory,
//! replacing any previous copy. Directories whose name is not a planned id
//! are left untouched.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use wsmirror_core::{ItemId, SyncConfig};

use crate::error::{io_err, SyncError};

/// What happened to one planned id during the install pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallResult {
    Installed { id: ItemId, path: PathBuf },
    /// The download tool produced no raw artifact for this id.
    NoArtifact { id: ItemId },
    Failed { id: ItemId, error: String },
}

impl InstallResult {
    pub fn id(&self) -> ItemId {
        match self {
            InstallResult::Installed { id, .. }
            | InstallResult::NoArtifact { id }
            | InstallResult::Failed { id, .. } => *id,
        }
    }

    pub fn is_installed(&self) -> bool {
        matches!(self, InstallResult::Installed { .. })
    }
}

/// Install every artifact for `update_ids`.
///
/// Returns one result per id, in `update_ids` order. Only failing to create
/// the serving directory is an error; per-file failures are reported.
pub fn install_artifacts(
    config: &SyncConfig,
    update_ids: &[ItemId],
) -> Result<Vec<InstallResult>, SyncError> {
    tracing::info!("preparing to move updated files to the serving directory");
    fs::create_dir_all(&config.serving_dir).map_err(|e| io_err(&config.serving_dir, e))?;

    let mut outcomes: HashMap<ItemId, InstallResult> = HashMap::new();
    for (id, raw) in find_artifacts(&config.app_content_dir(), &config.raw_extension, update_ids) {
        if matches!(outcomes.get(&id), Some(InstallResult::Failed { .. })) {
            continue;
        }
        let result = install_one(config, id, &raw);
        outcomes.insert(id, result);
    }

    Ok(update_ids
        .iter()
        .map(|id| {
            outcomes.remove(id).unwrap_or_else(|| {
                tracing::warn!("no downloaded artifact found for {id}");
                InstallResult::NoArtifact { id: *id }
            })
        })
        .collect())
}

/// Raw artifacts belonging to planned ids, collected before anything moves.
fn find_artifacts(
    content_dir: &Path,
    raw_extension: &str,
    update_ids: &[ItemId],
) -> Vec<(ItemId, PathBuf)> {
    if !content_dir.is_dir() {
        tracing::warn!("download directory {} does not exist", content_dir.display());
        return Vec::new();
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(content_dir).min_depth(2).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("skipping unreadable download entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match owning_id(entry.path(), raw_extension) {
            Some(id) if update_ids.contains(&id) => found.push((id, entry.into_path())),
            _ => {}
        }
    }
    found
}

/// Id of the item directory holding a raw artifact, if `path` is one.
fn owning_id(path: &Path, raw_extension: &str) -> Option<ItemId> {
    if path.extension()?.to_str()? != raw_extension {
        return None;
    }
    path.parent()?.file_name()?.to_str()?.parse().ok()
}

fn install_one(config: &SyncConfig, id: ItemId, raw: &Path) -> InstallResult {
    let file_name = config.installed_file_name(id);
    let renamed = raw.with_file_name(&file_name);
    let dest = config.serving_dir.join(&file_name);

    let moved = fs::rename(raw, &renamed)
        .map_err(|e| format!("rename {}: {e}", raw.display()))
        .and_then(|()| {
            move_file(&renamed, &dest).map_err(|e| {
                format!("move {} to {}: {e}", renamed.display(), dest.display())
            })
        });

    match moved {
        Ok(()) => {
            tracing::info!(
                "moved file to server from {} to {}",
                renamed.display(),
                dest.display()
            );
            InstallResult::Installed { id, path: dest }
        }
        Err(error) => {
            tracing::error!("failed to install {id}: {error}");
            InstallResult::Failed { id, error }
        }
    }
}

/// Rename, falling back to copy-then-rename when the rename crosses devices.
fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => return Ok(()),
        Err(err) => tracing::debug!("rename failed ({err}), copying instead"),
    }

    let mut tmp = dest.as_os_str().to_owned();
    tmp.push(".wsmirror.tmp");
    let tmp = PathBuf::from(tmp);

    fs::copy(src, &tmp)?;
    if let Err(err) = fs::rename(&tmp, dest) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    fs::remove_file(src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wsmirror_core::{Secret, SteamCmdConfig};

    fn id(raw: u64) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    fn config(root: &Path) -> SyncConfig {
        SyncConfig {
            api_key: Secret::new("key"),
            api_url: "http://127.0.0.1:9/".to_string(),
            app_id: 550,
            id_list: root.join("ids.txt"),
            state_file: root.join("state.json"),
            download_dir: root.join("download"),
            serving_dir: root.join("addons"),
            log_dir: root.join("logs"),
            raw_extension: "bin".to_string(),
            installed_extension: "vpk".to_string(),
            batch_divisor: 10,
            request_timeout_secs: 5,
            steamcmd: SteamCmdConfig {
                path: PathBuf::from("steamcmd"),
                username: "bot".to_string(),
                password: Secret::new(""),
                timeout_secs: 30,
            },
        }
    }

    fn download(config: &SyncConfig, dir: &str, file: &str, body: &[u8]) -> PathBuf {
        let item_dir = config.app_content_dir().join(dir);
        fs::create_dir_all(&item_dir).unwrap();
        let path = item_dir.join(file);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn raw_artifacts_are_renamed_and_moved() {
        let root = TempDir::new().unwrap();
        let cfg = config(root.path());
        let raw = download(&cfg, "10", "blob_legacy.bin", b"ten");
        download(&cfg, "20", "other.bin", b"twenty");

        let results = install_artifacts(&cfg, &[id(10), id(20)]).unwrap();

        assert!(results.iter().all(InstallResult::is_installed));
        assert_eq!(fs::read(cfg.serving_dir.join("10.vpk")).unwrap(), b"ten");
        assert_eq!(fs::read(cfg.serving_dir.join("20.vpk")).unwrap(), b"twenty");
        assert!(!raw.exists());
        assert!(!raw.with_file_name("10.vpk").exists());
    }

    #[test]
    fn existing_artifact_is_overwritten() {
        let root = TempDir::new().unwrap();
        let cfg = config(root.path());
        fs::create_dir_all(&cfg.serving_dir).unwrap();
        fs::write(cfg.serving_dir.join("10.vpk"), b"stale").unwrap();
        download(&cfg, "10", "a.bin", b"fresh");

        install_artifacts(&cfg, &[id(10)]).unwrap();
        assert_eq!(fs::read(cfg.serving_dir.join("10.vpk")).unwrap(), b"fresh");
    }

    #[test]
    fn unplanned_and_non_numeric_directories_are_untouched() {
        let root = TempDir::new().unwrap();
        let cfg = config(root.path());
        let unplanned = download(&cfg, "30", "a.bin", b"x");
        let named = download(&cfg, "maps", "b.bin", b"y");
        let other_ext = download(&cfg, "10", "readme.txt", b"z");

        let results = install_artifacts(&cfg, &[id(10)]).unwrap();

        assert_eq!(results, vec![InstallResult::NoArtifact { id: id(10) }]);
        assert!(unplanned.exists());
        assert!(named.exists());
        assert!(other_ext.exists());
        assert!(!cfg.serving_dir.join("30.vpk").exists());
    }

    #[test]
    fn missing_download_tree_reports_no_artifact() {
        let root = TempDir::new().unwrap();
        let cfg = config(root.path());
        let results = install_artifacts(&cfg, &[id(5), id(6)]).unwrap();
        assert_eq!(
            results,
            vec![
                InstallResult::NoArtifact { id: id(5) },
                InstallResult::NoArtifact { id: id(6) },
            ]
        );
        assert!(cfg.serving_dir.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn unwritable_serving_entry_is_reported_not_fatal() {
        let root = TempDir::new().unwrap();
        let cfg = config(root.path());
        fs::create_dir_all(cfg.serving_dir.join("10.vpk")).unwrap();
        fs::write(cfg.serving_dir.join("10.vpk").join("keep"), b"k").unwrap();
        download(&cfg, "10", "a.bin", b"data");
        download(&cfg, "20", "a.bin", b"data");

        let results = install_artifacts(&cfg, &[id(10), id(20)]).unwrap();

        assert!(matches!(results[0], InstallResult::Failed { .. }));
        assert!(results[1].is_installed());
    }

    #[test]
    fn results_follow_update_order() {
        let root = TempDir::new().unwrap();
        let cfg = config(root.path());
        download(&cfg, "2", "a.bin", b"2");
        download(&cfg, "1", "a.bin", b"1");

        let results = install_artifacts(&cfg, &[id(2), id(1)]).unwrap();
        let order: Vec<u64> = results.iter().map(|r| r.id().get()).collect();
        assert_eq!(order, vec![2, 1]);
    }
}
