//! Compare two manifests and report a consistency verdict.

use crate::SnapguardContext;
use crate::errors::StoreError;
use crate::manifest::Manifest;
use crate::manifest::diff::{self, DiffStatus, Verdict};
use crate::manifest::store::ManifestStore;
use crate::utils::format_timestamp;
use anyhow::{Result, bail};
use colored::Colorize;
use std::path::Path;

/// Load both manifests, diff them, print the report, and return the
/// verdict so the caller can set the exit code.
///
/// # Errors
///
/// Fails when either manifest is unavailable (missing or corrupt), when
/// the manifests describe different units, or when a partial manifest is
/// involved and `--allow-partial` (or the config equivalent) is not set.
pub fn execute(
    ctx: &SnapguardContext,
    base_path: &Path,
    candidate_path: &Path,
    allow_partial: bool,
    show_unchanged: bool,
) -> Result<Verdict> {
    let base = load_or_explain(base_path)?;
    let candidate = load_or_explain(candidate_path)?;

    let partial_ok = allow_partial || ctx.config.verify.allow_partial;
    for (label, manifest) in [("base", &base), ("candidate", &candidate)] {
        if manifest.is_partial() && !partial_ok {
            bail!(
                "{label} manifest is partial ({} files skipped); refusing to issue a \
                 consistency verdict from incomplete data (use --allow-partial to override)",
                manifest.skipped.len()
            );
        }
    }

    let report = diff::diff(&base, &candidate)?;

    println!(
        "Comparing `{}`: {} ({}) vs {} ({})",
        report.unit,
        base_path.display(),
        format_timestamp(base.captured_at),
        candidate_path.display(),
        format_timestamp(candidate.captured_at),
    );

    for entry in &report.entries {
        if entry.status == DiffStatus::Unchanged && !show_unchanged {
            continue;
        }
        let line = format!("{} {}", entry.status.status_char(), entry.path.display());
        match entry.status {
            DiffStatus::Added => println!("{}", line.green()),
            DiffStatus::Removed => println!("{}", line.red()),
            DiffStatus::Modified => println!("{}", line.yellow()),
            DiffStatus::Unchanged => println!("{}", line.dimmed()),
        }
    }

    let s = &report.summary;
    println!(
        "{} added, {} removed, {} modified, {} unchanged",
        s.added, s.removed, s.modified, s.unchanged
    );

    let verdict = report.verdict(&ctx.config.verdict_policy());
    match &verdict {
        Verdict::Consistent => super::print_success("CONSISTENT"),
        Verdict::Inconsistent { reason } => {
            super::print_error(&format!("INCONSISTENT: {reason}"));
        }
    }

    Ok(verdict)
}

/// Load a manifest, translating store failures into operator guidance. A
/// corrupt file is reported as "no usable manifest", not a crash.
fn load_or_explain(path: &Path) -> Result<Manifest> {
    match ManifestStore::load(path) {
        Ok(manifest) => Ok(manifest),
        Err(err @ StoreError::NotFound { .. }) => bail!("{err}"),
        Err(StoreError::Corrupt { path, reason }) => bail!(
            "no usable manifest at {}: {reason} (re-run the scan to produce a fresh one)",
            path.display()
        ),
        Err(err) => Err(err.into()),
    }
}
