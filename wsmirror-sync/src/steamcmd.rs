//! SteamCMD driver.
//!
//! Each batch becomes one invocation:
//!
//! ```text
//! steamcmd +force_install_dir <download_dir> +login <user> <password>
//!          +workshop_download_item <app> <id> ... +quit
//! ```
//!
//! The child is polled until it exits or the per-batch timeout expires, in
//! which case it is killed and the batch reported as timed out.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use wsmirror_core::{Secret, SyncConfig};

use crate::batch::{Batch, BatchOutcome, DownloadTool};

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const MASK: &str = "********";

#[derive(Debug, Clone)]
pub struct SteamCmd {
    program: PathBuf,
    install_dir: PathBuf,
    username: String,
    password: Secret,
    app_id: u32,
    timeout: Duration,
    quiet: bool,
}

impl SteamCmd {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            program: config.steamcmd.path.clone(),
            install_dir: config.download_dir.clone(),
            username: config.steamcmd.username.clone(),
            password: config.steamcmd.password.clone(),
            app_id: config.app_id,
            timeout: config.steamcmd.timeout(),
            quiet: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Discard the tool's stdout/stderr instead of inheriting the console.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Full argument vector for `batch`, credentials included.
    pub fn args(&self, batch: &Batch) -> Vec<String> {
        self.build_args(batch, self.password.expose())
    }

    /// Argument vector safe for logs.
    pub fn display_args(&self, batch: &Batch) -> String {
        self.build_args(batch, MASK).join(" ")
    }

    fn build_args(&self, batch: &Batch, password: &str) -> Vec<String> {
        let mut args = vec![
            "+force_install_dir".to_string(),
            self.install_dir.display().to_string(),
            "+login".to_string(),
            self.username.clone(),
        ];
        if !password.is_empty() {
            args.push(password.to_string());
        }
        for id in &batch.ids {
            args.push("+workshop_download_item".to_string());
            args.push(self.app_id.to_string());
            args.push(id.to_string());
        }
        args.push("+quit".to_string());
        args
    }

    fn wait_with_timeout(&self, mut child: Child) -> BatchOutcome {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => return BatchOutcome::Succeeded,
                Ok(Some(status)) => return BatchOutcome::Failed { code: status.code() },
                Ok(None) => {}
                Err(err) => {
                    return BatchOutcome::Io {
                        reason: format!("wait failed: {err}"),
                    }
                }
            }

            let now = Instant::now();
            if now >= deadline {
                if let Err(err) = child.kill() {
                    tracing::warn!(error = %err, "failed to kill timed-out download tool");
                }
                let _ = child.wait();
                return BatchOutcome::TimedOut {
                    after: self.timeout,
                };
            }
            sleep(POLL_INTERVAL.min(deadline - now));
        }
    }
}

impl DownloadTool for SteamCmd {
    fn run_batch(&self, batch: &Batch) -> BatchOutcome {
        tracing::debug!(
            "running {} {}",
            self.program.display(),
            self.display_args(batch)
        );

        let mut command = Command::new(&self.program);
        command.args(self.args(batch)).stdin(Stdio::null());
        if self.quiet {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        match command.spawn() {
            Ok(child) => self.wait_with_timeout(child),
            Err(err) => BatchOutcome::Io {
                reason: format!("{}: {err}", self.program.display()),
            },
        }
    }
}
