//! Scan storage units into persisted manifests.

use crate::SnapguardContext;
use crate::catalog::{StorageUnit, UnitName};
use crate::scanner::CancelFlag;
use crate::utils::local_hostname;
use anyhow::{Context, Result, bail};
use std::path::PathBuf;

/// Scan the named units (or every mounted filesystem) and persist one
/// manifest per unit.
///
/// # Errors
///
/// Fails on catalog errors, unknown or unmounted units, scan aborts, and
/// persistence failures. A partial manifest is not an error; it is saved
/// and reported with a warning.
pub fn execute(
    ctx: &SnapguardContext,
    unit_names: &[String],
    all_filesystems: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let targets = select_targets(ctx, unit_names, all_filesystems)?;
    if targets.is_empty() {
        bail!("No units to scan (specify unit names or --all-filesystems)");
    }

    let scanner = ctx.scanner();
    let store = ctx.store(output);
    let host = local_hostname();
    let cancel = CancelFlag::new();

    for unit in &targets {
        let manifest = scanner
            .scan(unit, &host, &cancel)
            .with_context(|| format!("Scan of `{}` failed", unit.name))?;

        if manifest.is_partial() {
            super::print_warning(&format!(
                "`{}`: {} files could not be hashed; manifest is PARTIAL",
                unit.name,
                manifest.skipped.len()
            ));
            for skip in &manifest.skipped {
                super::print_warning(&format!("  skipped {}: {}", skip.path.display(), skip.reason));
            }
        }

        let path = store
            .save(&manifest)
            .with_context(|| format!("Failed to persist manifest for `{}`", unit.name))?;
        super::print_success(&format!(
            "`{}`: {} files hashed -> {}",
            unit.name,
            manifest.file_count(),
            path.display()
        ));
    }

    Ok(())
}

/// Resolve the requested unit names against the catalog.
fn select_targets(
    ctx: &SnapguardContext,
    unit_names: &[String],
    all_filesystems: bool,
) -> Result<Vec<StorageUnit>> {
    let catalog = ctx.catalog();

    if all_filesystems {
        let mut mounted: Vec<StorageUnit> = catalog
            .list_filesystems()?
            .into_iter()
            .filter(|u| u.mountpoint.is_some())
            .collect();
        mounted.sort_by(|a, b| a.name.cmp(&b.name));
        return Ok(mounted);
    }

    let mut targets = Vec::with_capacity(unit_names.len());
    for raw in unit_names {
        let name = UnitName::parse(raw)?;
        let unit = catalog
            .find_unit(&name)?
            .with_context(|| format!("Unit `{name}` not found in the catalog"))?;
        targets.push(unit);
    }
    Ok(targets)
}
