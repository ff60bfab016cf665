//! wsmirror core library: domain types, configuration, identifier lists.
//!
//! Public API surface:
//! - [`types`]: item identifiers, remote entries, the persisted snapshot
//! - [`config`]: [`SyncConfig`] loaded from `wsmirror.yaml`
//! - [`id_list`]: the authoritative identifier list
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod id_list;
pub mod types;

pub use config::{Secret, SteamCmdConfig, SyncConfig};
pub use error::ConfigError;
pub use types::{ItemId, ParseItemIdError, SavedEntry, SyncState, WorkshopEntry};
