//! Log setup: a dated file under `log_dir` plus a console layer on stderr.
//!
//! The file receives INFO and above. The console shows warnings, or INFO
//! with `-v`; `RUST_LOG` overrides the console level.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

/// Dated log files kept after pruning.
pub const MAX_LOG_FILES: usize = 30;

const LOG_PREFIX: &str = "wsmirror_";
const LOG_SUFFIX: &str = ".log";

/// `<log_dir>/wsmirror_<YYYY-MM-DD>.log` for today (local time).
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d");
    log_dir.join(format!("{LOG_PREFIX}{date}{LOG_SUFFIX}"))
}

fn console_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }))
}

/// Console-only logging, for commands that do not touch the mirror.
pub fn init_console(verbose: bool) {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(console_filter(verbose)),
        )
        .try_init();
}

/// File and console logging. If the log file cannot be opened the run
/// continues with console output only.
pub fn init(log_dir: &Path, verbose: bool) {
    let file = match open_log_file(log_dir) {
        Ok(file) => file,
        Err(err) => {
            init_console(verbose);
            tracing::warn!("cannot open log file in {}: {err}", log_dir.display());
            return;
        }
    };

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .with_filter(LevelFilter::INFO),
        )
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(console_filter(verbose)),
        )
        .try_init();

    match prune_dated_logs(log_dir, MAX_LOG_FILES) {
        Ok(0) => {}
        Ok(removed) => tracing::info!("removed {removed} old log file(s)"),
        Err(err) => tracing::warn!(error = %err, "log pruning failed"),
    }
}

fn open_log_file(log_dir: &Path) -> io::Result<File> {
    fs::create_dir_all(log_dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path(log_dir))
}

/// Delete the oldest `wsmirror_<date>.log` files so at most `keep` remain.
///
/// Returns how many were removed. Other files in `log_dir` are ignored.
pub fn prune_dated_logs(log_dir: &Path, keep: usize) -> io::Result<usize> {
    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err),
    };

    let mut dated = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if is_dated_log(name) && entry.file_type()?.is_file() {
            dated.push(entry.path());
        }
    }
    if dated.len() <= keep {
        return Ok(0);
    }

    // ISO dates sort chronologically.
    dated.sort();
    let excess = dated.len() - keep;
    for path in &dated[..excess] {
        fs::remove_file(path)?;
    }
    Ok(excess)
}

fn is_dated_log(name: &str) -> bool {
    name.strip_prefix(LOG_PREFIX)
        .and_then(|rest| rest.strip_suffix(LOG_SUFFIX))
        .map(|date| chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok())
        .unwrap_or(false)
}
