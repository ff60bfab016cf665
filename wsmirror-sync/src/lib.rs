//! # wsmirror-sync
//!
//! Reconciliation and sync-batching engine.
//!
//! Call [`run`] with a loaded [`SyncConfig`](wsmirror_core::SyncConfig), a
//! [`MetadataSource`] and a [`DownloadTool`]. Production code passes
//! [`SteamWebApi`] and [`SteamCmd`]; tests pass fakes.

pub mod batch;
pub mod error;
pub mod installer;
pub mod integrity;
pub mod metadata;
pub mod pipeline;
pub mod reconcile;
pub mod state_store;
pub mod steamcmd;
pub mod update_set;

pub use batch::{Batch, BatchOutcome, BatchReport, DownloadTool};
pub use error::SyncError;
pub use installer::InstallResult;
pub use integrity::{MissingFileReport, SizeMismatch};
pub use metadata::{ItemDetails, MetadataBatch, MetadataSource, SteamWebApi};
pub use pipeline::{run, RunOptions, RunOutcome, RunReport};
pub use reconcile::{PlannedUpdate, UpdatePlan, UpdateReason};
pub use steamcmd::SteamCmd;
pub use update_set::UpdateSet;
