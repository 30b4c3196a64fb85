//! End-to-end: scan a tree, persist the manifest, mutate the tree, scan
//! again, and verify the diff reports exactly what changed.

use anyhow::Result;
use snapguard::catalog::{StorageUnit, UnitName};
use snapguard::hasher::{DEFAULT_CHUNK_SIZE, hash_bytes};
use snapguard::manifest::diff::{DiffStatus, Verdict, VerdictPolicy, diff};
use snapguard::manifest::store::ManifestStore;
use snapguard::scanner::{CancelFlag, Scanner};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn unit_at(root: &Path) -> StorageUnit {
    StorageUnit {
        name: UnitName::parse("pool/data").unwrap(),
        used: "1G".to_string(),
        avail: "9G".to_string(),
        refer: "1G".to_string(),
        mountpoint: Some(root.to_path_buf()),
    }
}

fn status_of(report: &snapguard::manifest::diff::ManifestDiff, suffix: &str) -> DiffStatus {
    report
        .entries
        .iter()
        .find(|e| e.path.ends_with(suffix))
        .unwrap_or_else(|| panic!("no entry ending in {suffix}"))
        .status
}

#[test]
fn scan_mutate_rescan_diff() -> Result<()> {
    let tree = TempDir::new()?;
    fs::write(tree.path().join("a.txt"), b"hello")?;
    fs::write(tree.path().join("b.txt"), b"world")?;

    let unit = unit_at(tree.path());
    let scanner = Scanner::new(DEFAULT_CHUNK_SIZE);
    let cancel = CancelFlag::new();

    let t1 = scanner.scan(&unit, "backuphost", &cancel)?;
    assert_eq!(t1.file_count(), 2);
    assert!(!t1.is_partial());

    let d_a = hash_bytes(b"hello");
    let rec_a = t1.files.iter().find(|r| r.path.ends_with("a.txt")).unwrap();
    assert_eq!(rec_a.digest.as_deref(), Some(d_a.as_str()));

    // b.txt changes, c.txt appears
    fs::write(tree.path().join("b.txt"), b"earth")?;
    fs::write(tree.path().join("c.txt"), b"new file")?;

    let t2 = scanner.scan(&unit, "backuphost", &cancel)?;
    let report = diff(&t1, &t2)?;

    assert_eq!(status_of(&report, "a.txt"), DiffStatus::Unchanged);
    assert_eq!(status_of(&report, "b.txt"), DiffStatus::Modified);
    assert_eq!(status_of(&report, "c.txt"), DiffStatus::Added);
    assert_eq!(report.summary.added, 1);
    assert_eq!(report.summary.modified, 1);
    assert_eq!(report.summary.unchanged, 1);
    assert_eq!(report.summary.removed, 0);

    // Modified content always breaks consistency, whatever the policy
    let verdict = report.verdict(&VerdictPolicy {
        fail_on_added: false,
        fail_on_removed: false,
    });
    assert!(matches!(verdict, Verdict::Inconsistent { .. }));
    Ok(())
}

#[test]
fn manifest_round_trips_through_store() -> Result<()> {
    let tree = TempDir::new()?;
    fs::create_dir_all(tree.path().join("nested/dir"))?;
    fs::write(tree.path().join("top.bin"), vec![0u8; 10_000])?;
    fs::write(tree.path().join("nested/dir/leaf.txt"), b"leaf")?;

    let scanner = Scanner::new(DEFAULT_CHUNK_SIZE);
    let manifest = scanner.scan(&unit_at(tree.path()), "host", &CancelFlag::new())?;

    let store_dir = TempDir::new()?;
    let store = ManifestStore::new(store_dir.path().to_path_buf(), 3);
    let saved_path = store.save(&manifest)?;

    let restored = ManifestStore::load(&saved_path)?;
    assert_eq!(restored, manifest);

    // Unchanged tree scanned again diffs clean against the restored copy
    let again = scanner.scan(&unit_at(tree.path()), "host", &CancelFlag::new())?;
    assert!(diff(&restored, &again)?.is_clean());
    Ok(())
}

#[test]
fn manifests_are_append_only_history() -> Result<()> {
    let tree = TempDir::new()?;
    fs::write(tree.path().join("f"), b"x")?;

    let scanner = Scanner::new(DEFAULT_CHUNK_SIZE);
    let manifest = scanner.scan(&unit_at(tree.path()), "host", &CancelFlag::new())?;

    let store_dir = TempDir::new()?;
    let store = ManifestStore::new(store_dir.path().to_path_buf(), 3);
    store.save(&manifest)?;

    // Same unit, same capture second: refuse to overwrite
    assert!(store.save(&manifest).is_err());
    Ok(())
}

#[test]
fn empty_tree_versus_populated_tree() -> Result<()> {
    let empty = TempDir::new()?;
    let full = TempDir::new()?;
    for i in 0..5 {
        fs::write(full.path().join(format!("f{i}")), format!("content {i}"))?;
    }

    let scanner = Scanner::new(DEFAULT_CHUNK_SIZE);
    let cancel = CancelFlag::new();

    // Both trees stand in for the same logical unit at different times
    let before = scanner.scan(&unit_at(empty.path()), "h", &cancel)?;
    let after = scanner.scan(&unit_at(full.path()), "h", &cancel)?;

    let report = diff(&before, &after)?;
    assert_eq!(report.summary.added, 5);
    assert_eq!(report.summary.removed, 0);
    assert_eq!(report.summary.modified, 0);
    Ok(())
}
