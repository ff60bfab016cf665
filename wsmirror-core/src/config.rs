//! Run configuration loaded from `wsmirror.yaml`.
//!
//! # Path resolution
//!
//! Relative paths are resolved against the directory holding the config
//! file, so a run behaves the same regardless of the working directory.
//! A leading `~/` expands to the home directory. A bare `steamcmd.path`
//! (no directory component) is left alone and looked up on `$PATH`.
//!
//! # Environment overrides
//!
//! - `WSMIRROR_API_KEY` replaces `api_key`
//! - `WSMIRROR_STEAM_PASSWORD` replaces `steamcmd.password`

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{invalid, io_err, ConfigError};

pub const DEFAULT_CONFIG_FILE: &str = "wsmirror.yaml";
pub const DEFAULT_API_URL: &str =
    "https://api.steampowered.com/ISteamRemoteStorage/GetPublishedFileDetails/v1/";

pub const ENV_API_KEY: &str = "WSMIRROR_API_KEY";
pub const ENV_STEAM_PASSWORD: &str = "WSMIRROR_STEAM_PASSWORD";

// ---------------------------------------------------------------------------
// Secret
// ---------------------------------------------------------------------------

/// A credential that never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

// ---------------------------------------------------------------------------
// Config records
// ---------------------------------------------------------------------------

/// Download tool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SteamCmdConfig {
    #[serde(default = "default_steamcmd_path")]
    pub path: PathBuf,
    pub username: String,
    #[serde(default)]
    pub password: Secret,
    /// Upper bound on a single batch invocation.
    #[serde(default = "default_steamcmd_timeout")]
    pub timeout_secs: u64,
}

impl SteamCmdConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Everything one run needs; passed explicitly into each stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    #[serde(default)]
    pub api_key: Secret,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_app_id")]
    pub app_id: u32,
    /// Authoritative identifier list, one id per line.
    #[serde(default = "default_id_list")]
    pub id_list: PathBuf,
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    /// Output root handed to the download tool (`+force_install_dir`).
    pub download_dir: PathBuf,
    /// Flat directory of installed `<id>.<ext>` artifacts.
    pub serving_dir: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_raw_extension")]
    pub raw_extension: String,
    #[serde(default = "default_installed_extension")]
    pub installed_extension: String,
    /// Target number of items per download batch.
    #[serde(default = "default_batch_divisor")]
    pub batch_divisor: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    pub steamcmd: SteamCmdConfig,
}

fn default_steamcmd_path() -> PathBuf {
    PathBuf::from("steamcmd")
}
fn default_steamcmd_timeout() -> u64 {
    60 * 60
}
fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}
fn default_app_id() -> u32 {
    550
}
fn default_id_list() -> PathBuf {
    PathBuf::from("workshop_addons.txt")
}
fn default_state_file() -> PathBuf {
    PathBuf::from("workshop_updater_data.json")
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}
fn default_raw_extension() -> String {
    "bin".to_string()
}
fn default_installed_extension() -> String {
    "vpk".to_string()
}
fn default_batch_divisor() -> usize {
    10
}
fn default_request_timeout() -> u64 {
    60
}

impl SyncConfig {
    /// Load, resolve and validate the config at `path`.
    ///
    /// Returns `ConfigError::Io` if unreadable, `ConfigError::Parse` (with
    /// path + line context) if malformed or carrying unknown keys, and
    /// `ConfigError::Invalid` if a value is unusable.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let mut config: SyncConfig = serde_yaml::from_str(&contents).map_err(|e| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        config.apply_env_overrides(|key| std::env::var(key).ok());

        let base = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        config.resolve_paths(&base)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace credentials from the environment. `lookup` is `std::env::var`
    /// in production; tests pass a closure.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.api_key = Secret::new(key);
        }
        if let Some(password) = lookup(ENV_STEAM_PASSWORD).filter(|v| !v.is_empty()) {
            self.steamcmd.password = Secret::new(password);
        }
    }

    /// Make every path absolute-or-base-relative and expand `~/`.
    pub fn resolve_paths(&mut self, base: &Path) -> Result<(), ConfigError> {
        for path in [
            &mut self.id_list,
            &mut self.state_file,
            &mut self.download_dir,
            &mut self.serving_dir,
            &mut self.log_dir,
        ] {
            *path = resolve(base, path)?;
        }
        if !is_bare_command(&self.steamcmd.path) {
            self.steamcmd.path = resolve(base, &self.steamcmd.path)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(invalid(
                "api_key",
                format!("must be set in the config file or via ${ENV_API_KEY}"),
            ));
        }
        if self.api_url.trim().is_empty() {
            return Err(invalid("api_url", "must not be empty"));
        }
        if self.steamcmd.username.trim().is_empty() {
            return Err(invalid("steamcmd.username", "must not be empty"));
        }
        if self.steamcmd.timeout_secs == 0 {
            return Err(invalid("steamcmd.timeout_secs", "must be at least 1"));
        }
        if self.batch_divisor == 0 {
            return Err(invalid("batch_divisor", "must be at least 1"));
        }
        validate_extension("raw_extension", &self.raw_extension)?;
        validate_extension("installed_extension", &self.installed_extension)?;
        if self.download_dir == self.serving_dir {
            return Err(invalid("serving_dir", "must differ from download_dir"));
        }
        Ok(())
    }

    /// `<download_dir>/steamapps/workshop/content`: the tool writes
    /// `<app-id>/<item-id>/` below it.
    pub fn content_root(&self) -> PathBuf {
        self.download_dir
            .join("steamapps")
            .join("workshop")
            .join("content")
    }

    /// `<content_root>/<app-id>`
    pub fn app_content_dir(&self) -> PathBuf {
        self.content_root().join(self.app_id.to_string())
    }

    /// Installed filename for an item: `<id>.<installed_extension>`.
    pub fn installed_file_name(&self, id: crate::ItemId) -> String {
        format!("{id}.{}", self.installed_extension)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Commented starter config written by `wsmirror init`.
    pub fn template() -> String {
        format!(
            r#"# wsmirror configuration. Relative paths resolve against this file's directory.

# Steam Web API key (or set ${ENV_API_KEY}).
api_key: ""
app_id: 550

# One workshop id per line; lines starting with // are comments.
id_list: workshop_addons.txt
state_file: workshop_updater_data.json
log_dir: logs

# Where SteamCMD downloads to, and the server's addons directory.
download_dir: workshop_downloads
serving_dir: addons

raw_extension: bin
installed_extension: vpk
batch_divisor: 10
request_timeout_secs: 60

steamcmd:
  path: steamcmd
  # Steam Guard must be disabled for this account.
  username: ""
  # Or set ${ENV_STEAM_PASSWORD}.
  password: ""
  timeout_secs: 3600
"#
        )
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn validate_extension(field: &'static str, ext: &str) -> Result<(), ConfigError> {
    if ext.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if ext.starts_with('.') || ext.contains(['/', '\\']) {
        return Err(invalid(
            field,
            format!("expected a bare extension like `vpk`, got `{ext}`"),
        ));
    }
    Ok(())
}

fn resolve(base: &Path, path: &Path) -> Result<PathBuf, ConfigError> {
    let expanded = expand_home(path)?;
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base.join(expanded))
    }
}

fn expand_home(path: &Path) -> Result<PathBuf, ConfigError> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
            Ok(home.join(components.as_path()))
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn is_bare_command(path: &Path) -> bool {
    let mut components = path.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name != "~"
    )
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
