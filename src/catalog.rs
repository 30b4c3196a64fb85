//! Storage unit catalog backed by the external `zfs` tool.
//!
//! The catalog enumerates filesystems and snapshots by invoking
//! `zfs list -H` and parsing its tab-separated output. Each well-formed line
//! yields one [`StorageUnit`]; malformed lines (too few fields, or a name
//! that fails the unit-name grammar) are routine and silently skipped.
//! A failed tool invocation, in contrast, is surfaced to the caller as a
//! [`CatalogError`].

use crate::errors::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Number of tab-separated fields in one `zfs list -H` line.
const LIST_FIELDS: usize = 5;

/// Parsed unit name following the strict grammar
/// `<filesystem>[ '@' <snapshot-label> ]`.
///
/// Exactly zero or one `@` is accepted; an empty filesystem component or an
/// empty label after the `@` is rejected. This replaces best-effort
/// delimiter splitting so that a malformed name can never masquerade as a
/// snapshot of some other filesystem.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitName {
    /// The base filesystem component (before any `@`).
    filesystem: String,
    /// The snapshot label, when the unit is a snapshot.
    snapshot: Option<String>,
}

impl UnitName {
    /// Parse a raw name against the unit-name grammar.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidUnitName`] when the name is empty,
    /// contains more than one `@`, or has an empty component on either side
    /// of the `@`.
    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidUnitName {
            name: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = raw.split('@');
        let filesystem = parts.next().unwrap_or_default();
        let snapshot = parts.next();
        if parts.next().is_some() {
            return Err(invalid("more than one '@' delimiter"));
        }
        if filesystem.is_empty() {
            return Err(invalid("empty filesystem component"));
        }
        match snapshot {
            Some("") => Err(invalid("empty snapshot label after '@'")),
            Some(label) => Ok(Self {
                filesystem: filesystem.to_string(),
                snapshot: Some(label.to_string()),
            }),
            None => Ok(Self {
                filesystem: filesystem.to_string(),
                snapshot: None,
            }),
        }
    }

    /// The base filesystem component.
    #[must_use]
    pub fn filesystem(&self) -> &str {
        &self.filesystem
    }

    /// The snapshot label, if this unit is a snapshot.
    #[must_use]
    pub fn snapshot_label(&self) -> Option<&str> {
        self.snapshot.as_deref()
    }

    /// Whether this unit names a snapshot rather than a live filesystem.
    #[must_use]
    pub const fn is_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Whether `other` is a snapshot (or the live filesystem) of the same
    /// base filesystem lineage.
    #[must_use]
    pub fn same_lineage(&self, other: &Self) -> bool {
        self.filesystem == other.filesystem
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.snapshot {
            Some(label) => write!(f, "{}@{}", self.filesystem, label),
            None => write!(f, "{}", self.filesystem),
        }
    }
}

/// One filesystem or snapshot as reported by the storage subsystem.
///
/// Constructed fresh on every catalog query and never mutated afterwards.
/// Identity for set membership is the unit name alone: two lines reporting
/// the same name collapse into one catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageUnit {
    /// Unique unit name.
    pub name: UnitName,
    /// Space used, as printed by the tool (human-readable string).
    pub used: String,
    /// Space available, as printed by the tool.
    pub avail: String,
    /// Space referenced, as printed by the tool.
    pub refer: String,
    /// Absolute mount path, or `None` when the unit is not mounted.
    pub mountpoint: Option<PathBuf>,
}

impl StorageUnit {
    /// Snapshot timestamp label derived from the unit name, if any.
    #[must_use]
    pub fn snapshot_label(&self) -> Option<&str> {
        self.name.snapshot_label()
    }
}

impl PartialEq for StorageUnit {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for StorageUnit {}

impl Hash for StorageUnit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// Parse one `zfs list -H` output line into a unit.
///
/// Returns `None` for lines that are blank, have fewer than five
/// tab-separated fields, or carry a name outside the unit-name grammar.
/// These are expected in real tool output and are not errors.
fn parse_unit_line(line: &str) -> Option<StorageUnit> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < LIST_FIELDS {
        return None;
    }

    let name = UnitName::parse(fields[0]).ok()?;
    let mountpoint = match fields[4] {
        "" | "-" | "none" | "legacy" => None,
        path => Some(PathBuf::from(path)),
    };

    Some(StorageUnit {
        name,
        used: fields[1].to_string(),
        avail: fields[2].to_string(),
        refer: fields[3].to_string(),
        mountpoint,
    })
}

/// Catalog of storage units, queried through the `zfs` command-line tool.
pub struct ZfsCatalog {
    /// Path or name of the `zfs` binary to invoke.
    zfs_path: String,
}

impl ZfsCatalog {
    /// Create a catalog that invokes the given `zfs` binary.
    #[must_use]
    pub fn new(zfs_path: impl Into<String>) -> Self {
        Self {
            zfs_path: zfs_path.into(),
        }
    }

    /// List all filesystems known to the storage subsystem.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ToolInvocation`] or
    /// [`CatalogError::ToolFailed`] when the external tool cannot be run.
    pub fn list_filesystems(&self) -> Result<HashSet<StorageUnit>, CatalogError> {
        self.list(&["list", "-H"])
    }

    /// List all snapshots known to the storage subsystem.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::list_filesystems`].
    pub fn list_snapshots(&self) -> Result<HashSet<StorageUnit>, CatalogError> {
        self.list(&["list", "-t", "snapshot", "-H"])
    }

    /// Look up a single unit by name across filesystems and snapshots.
    ///
    /// # Errors
    ///
    /// Propagates catalog query failures; a missing unit is `Ok(None)`.
    pub fn find_unit(&self, name: &UnitName) -> Result<Option<StorageUnit>, CatalogError> {
        let pool = if name.is_snapshot() {
            self.list_snapshots()?
        } else {
            self.list_filesystems()?
        };
        Ok(pool.into_iter().find(|u| &u.name == name))
    }

    /// Run the tool with the given arguments and parse every output line.
    fn list(&self, args: &[&str]) -> Result<HashSet<StorageUnit>, CatalogError> {
        let command = format!("{} {}", self.zfs_path, args.join(" "));
        let output = Command::new(&self.zfs_path).args(args).output().map_err(
            |source| CatalogError::ToolInvocation {
                command: command.clone(),
                source,
            },
        )?;

        if !output.status.success() {
            return Err(CatalogError::ToolFailed {
                command,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let units = parse_listing(&stdout);
        debug!(command = %command, count = units.len(), "catalog query");
        Ok(units)
    }
}

/// Parse a full tool listing into a deduplicated unit set.
fn parse_listing(stdout: &str) -> HashSet<StorageUnit> {
    stdout.lines().filter_map(parse_unit_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_name_filesystem() {
        let name = UnitName::parse("pool/data").unwrap();
        assert_eq!(name.filesystem(), "pool/data");
        assert_eq!(name.snapshot_label(), None);
        assert!(!name.is_snapshot());
        assert_eq!(name.to_string(), "pool/data");
    }

    #[test]
    fn test_unit_name_snapshot() {
        let name = UnitName::parse("pool/data@2024-01-01").unwrap();
        assert_eq!(name.filesystem(), "pool/data");
        assert_eq!(name.snapshot_label(), Some("2024-01-01"));
        assert!(name.is_snapshot());
        assert_eq!(name.to_string(), "pool/data@2024-01-01");
    }

    #[test]
    fn test_unit_name_rejects_malformed() {
        assert!(UnitName::parse("").is_err());
        assert!(UnitName::parse("@snap").is_err());
        assert!(UnitName::parse("pool/data@").is_err());
        assert!(UnitName::parse("pool@a@b").is_err());
    }

    #[test]
    fn test_lineage() {
        let live = UnitName::parse("pool/data").unwrap();
        let snap = UnitName::parse("pool/data@monday").unwrap();
        let other = UnitName::parse("pool/home@monday").unwrap();
        assert!(live.same_lineage(&snap));
        assert!(!snap.same_lineage(&other));
    }

    #[test]
    fn test_parse_unit_line() {
        let unit =
            parse_unit_line("pool/data\t1.2G\t10G\t1.2G\t/pool/data").unwrap();
        assert_eq!(unit.name.to_string(), "pool/data");
        assert_eq!(unit.used, "1.2G");
        assert_eq!(unit.avail, "10G");
        assert_eq!(unit.refer, "1.2G");
        assert_eq!(unit.mountpoint, Some(PathBuf::from("/pool/data")));
    }

    #[test]
    fn test_parse_unit_line_unmounted() {
        for mp in ["-", "none", "legacy", ""] {
            let line = format!("pool/data@snap1\t0B\t-\t1.2G\t{mp}");
            let unit = parse_unit_line(&line).unwrap();
            assert_eq!(unit.mountpoint, None);
            assert_eq!(unit.snapshot_label(), Some("snap1"));
        }
    }

    #[test]
    fn test_parse_unit_line_skips_malformed() {
        assert!(parse_unit_line("").is_none());
        assert!(parse_unit_line("pool/data\t1G\t2G").is_none());
        // Name outside the grammar is skipped, not fatal
        assert!(parse_unit_line("pool@a@b\t1G\t2G\t1G\t/x").is_none());
    }

    #[test]
    fn test_parse_listing_dedupes_and_tolerates_trailing_newline() {
        let out = "pool\t1G\t9G\t1G\t/pool\n\
                   pool/data\t1G\t9G\t1G\t/pool/data\n\
                   pool\t1G\t9G\t1G\t/pool\n\
                   garbage line\n\
                   \n";
        let units = parse_listing(out);
        assert_eq!(units.len(), 2);
    }

    #[test]
    fn test_catalog_tool_invocation_error() {
        let catalog = ZfsCatalog::new("/nonexistent/zfs-binary");
        let err = catalog.list_filesystems().unwrap_err();
        assert!(matches!(err, CatalogError::ToolInvocation { .. }));
    }

    #[test]
    fn test_catalog_tool_failed() {
        // `false` runs fine but exits non-zero
        let catalog = ZfsCatalog::new("false");
        let err = catalog.list_filesystems().unwrap_err();
        assert!(matches!(err, CatalogError::ToolFailed { .. }));
    }
}
