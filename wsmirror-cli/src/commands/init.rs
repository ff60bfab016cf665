//! `wsmirror init [--force]`

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;

use wsmirror_core::SyncConfig;

const ID_LIST_FILE: &str = "workshop_addons.txt";

const ID_LIST_TEMPLATE: &str = "\
// One Steam Workshop item id per line.
// Lines starting with // are ignored.
";

/// Write a starter configuration and an empty identifier list.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        if config_path.exists() && !self.force {
            bail!(
                "'{}' already exists; pass --force to overwrite it",
                config_path.display()
            );
        }

        let dir = match config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create directory '{}'", dir.display()))?;

        fs::write(config_path, SyncConfig::template())
            .with_context(|| format!("failed to write '{}'", config_path.display()))?;
        println!("✓ Wrote {}", config_path.display());

        let id_list = dir.join(ID_LIST_FILE);
        if id_list.exists() {
            println!("  ·  kept existing {}", id_list.display());
        } else {
            fs::write(&id_list, ID_LIST_TEMPLATE)
                .with_context(|| format!("failed to write '{}'", id_list.display()))?;
            println!("✓ Wrote {}", id_list.display());
        }

        println!("  Set api_key and steamcmd.username, then run `wsmirror sync`.");
        Ok(())
    }
}
