//! Utility functions and helpers.
//!
//! # Submodules
//!
//! - [`serialization`]: Binary serialization
//! - [`thread_pool`]: Thread pool configuration

/// Binary serialization utilities
pub mod serialization;
/// Thread pool configuration for parallel operations
pub mod thread_pool;

use chrono::DateTime;

/// Hostname of the machine performing the scan, recorded into manifests.
#[must_use]
pub fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| String::from("unknown"))
}

/// Format a unix-seconds timestamp for display.
#[must_use]
pub fn format_timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0).map_or_else(
        || format!("@{secs}"),
        |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}
