//! List storage units known to the storage subsystem.

use crate::SnapguardContext;
use anyhow::Result;
use colored::Colorize;

/// Print the catalog of filesystems or snapshots, sorted by name.
///
/// # Errors
///
/// Propagates catalog failures (the external tool being unavailable or
/// exiting non-zero is fatal to this command).
pub fn execute(ctx: &SnapguardContext, snapshots: bool) -> Result<()> {
    let catalog = ctx.catalog();
    let units = if snapshots {
        catalog.list_snapshots()?
    } else {
        catalog.list_filesystems()?
    };

    if units.is_empty() {
        super::print_info(if snapshots {
            "No snapshots found"
        } else {
            "No filesystems found"
        });
        return Ok(());
    }

    let mut units: Vec<_> = units.into_iter().collect();
    units.sort_by(|a, b| a.name.cmp(&b.name));

    println!(
        "{:<40} {:>8} {:>8} {:>8}  {}",
        "NAME".bold(),
        "USED".bold(),
        "AVAIL".bold(),
        "REFER".bold(),
        "MOUNTPOINT".bold()
    );
    for unit in units {
        let mountpoint = unit
            .mountpoint
            .as_ref()
            .map_or_else(|| "-".dimmed().to_string(), |p| p.display().to_string());
        println!(
            "{:<40} {:>8} {:>8} {:>8}  {}",
            unit.name.to_string(),
            unit.used,
            unit.avail,
            unit.refer,
            mountpoint
        );
    }

    Ok(())
}
