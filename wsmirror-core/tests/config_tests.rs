//! Config loading, error-message, and identifier-list integration tests.

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use rstest::rstest;
use wsmirror_core::{config::SyncConfig, id_list, ConfigError, ItemId};

const VALID: &str = r#"
api_key: "key"
download_dir: downloads
serving_dir: addons
steamcmd:
  path: bin/steamcmd.sh
  username: bot
  password: pw
"#;

fn write_config(dir: &assert_fs::TempDir, body: &str) -> std::path::PathBuf {
    let file = dir.child("wsmirror.yaml");
    file.write_str(body).expect("write config");
    file.path().to_path_buf()
}

// ---------------------------------------------------------------------------
// 1. Load
// ---------------------------------------------------------------------------

#[test]
fn load_resolves_paths_against_config_directory() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = write_config(&dir, VALID);

    let config = SyncConfig::load_at(&path).expect("load");
    assert_eq!(config.download_dir, dir.path().join("downloads"));
    assert_eq!(config.serving_dir, dir.path().join("addons"));
    assert_eq!(config.id_list, dir.path().join("workshop_addons.txt"));
    assert_eq!(config.steamcmd.path, dir.path().join("bin/steamcmd.sh"));
    assert_eq!(config.steamcmd.password.expose(), "pw");
}

#[test]
fn load_missing_file_returns_io_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let err = SyncConfig::load_at(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "got: {err}");
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn unknown_key_is_rejected_loudly() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = write_config(&dir, &format!("{VALID}\nsteam_user: typo\n"));

    let err = SyncConfig::load_at(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains("wsmirror.yaml"), "must contain file path, got: {msg}");
    let source_msg = match &err {
        ConfigError::Parse { source, .. } => source.to_string(),
        _ => unreachable!(),
    };
    assert!(source_msg.contains("steam_user"), "got: {source_msg}");
}

#[rstest]
#[case::zero_divisor("batch_divisor: 0\n", "batch_divisor")]
#[case::dotted_raw_extension("raw_extension: .bin\n", "raw_extension")]
#[case::same_dirs("serving_dir: downloads\n", "serving_dir")]
fn invalid_values_name_the_field(#[case] extra: &str, #[case] field: &str) {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let body = VALID.replace("serving_dir: addons\n", "");
    let body = if extra.starts_with("serving_dir") {
        format!("{body}{extra}")
    } else {
        format!("{body}serving_dir: addons\n{extra}")
    };
    let path = write_config(&dir, &body);

    let err = SyncConfig::load_at(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }), "got: {err}");
    assert!(err.to_string().contains(field), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Identifier list
// ---------------------------------------------------------------------------

#[test]
fn id_list_loads_and_skips_bad_lines() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let list = dir.child("workshop_addons.txt");
    list.write_str("// server addons\n123\nnot-a-number\n456\n123\n")
        .expect("write");
    list.assert(predicate::path::exists());

    let ids = id_list::load_id_list(list.path()).expect("load");
    let expected: Vec<ItemId> = [123, 456].into_iter().filter_map(ItemId::new).collect();
    assert_eq!(ids, expected);
}

#[test]
fn id_list_missing_file_is_an_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let err = id_list::load_id_list(&dir.path().join("nope.txt")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
