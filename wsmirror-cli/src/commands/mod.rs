//! Subcommand implementations.

pub mod check;
pub mod init;
pub mod status;
pub mod sync;

/// `2024-03-01 12:00 UTC` for a Unix timestamp, or the raw number if out of range.
pub(crate) fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
