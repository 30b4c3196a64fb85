//! Inspect a persisted manifest.

use crate::manifest::store::ManifestStore;
use crate::utils::format_timestamp;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

/// Print a manifest's metadata and, optionally, every file record.
///
/// # Errors
///
/// Fails when the manifest is missing or corrupt.
pub fn execute(path: &Path, show_files: bool) -> Result<()> {
    let manifest = ManifestStore::load(path)
        .with_context(|| format!("Cannot read manifest {}", path.display()))?;

    println!("{}  {}", "unit:".bold(), manifest.unit);
    println!(
        "{}  {}",
        "captured:".bold(),
        format_timestamp(manifest.captured_at)
    );
    println!("{}  {}", "host:".bold(), manifest.host);
    println!("{}  {}", "files:".bold(), manifest.file_count());
    if manifest.is_partial() {
        super::print_warning(&format!(
            "PARTIAL: {} files were skipped during the scan",
            manifest.skipped.len()
        ));
        for skip in &manifest.skipped {
            println!("  {} {}: {}", "skipped".yellow(), skip.path.display(), skip.reason);
        }
    }

    if show_files {
        for record in &manifest.files {
            let digest = record.digest.as_deref().unwrap_or("-");
            println!(
                "{digest}  {}  {}",
                format_timestamp(record.modified),
                record.path.display()
            );
        }
    }

    Ok(())
}
