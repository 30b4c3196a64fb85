//! Recursive tree scanner.
//!
//! A scan walks a storage unit's mountpoint, discovers every regular file
//! exactly once, hashes the files on the shared rayon pool, and seals the
//! results into a [`Manifest`]. Symbolic links are never followed, so a
//! link into another subtree cannot cause cycles or double-counting, and
//! directories themselves are not recorded.
//!
//! Per-file failures (a file deleted or made unreadable between discovery
//! and hashing) never abort the walk: the path lands in the manifest's
//! skipped list and the manifest comes out flagged partial. Only an
//! unreadable scan root, a builder contract violation, or cancellation
//! aborts the scan as a whole.

use crate::catalog::StorageUnit;
use crate::errors::ScanError;
use crate::hasher;
use crate::manifest::{FileRecord, Manifest, ManifestBuilder, SharedBuilder};
use crate::utils::thread_pool;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Cooperative cancellation signal for an in-flight scan. Raise it with
/// [`CancelFlag::cancel`]; workers check it between files and the scan
/// returns [`ScanError::Cancelled`] without persisting anything.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    /// Shared raised/not-raised state.
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Create an unraised flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the scan holding this flag.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Scanner producing manifests from storage unit trees.
pub struct Scanner {
    /// Read chunk size handed to the hasher.
    chunk_size: usize,
}

impl Scanner {
    /// Create a scanner reading files in `chunk_size` chunks.
    #[must_use]
    pub const fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// Scan a storage unit into a sealed manifest.
    ///
    /// The capture timestamp is taken at the start of the walk. Hashing of
    /// distinct files runs in parallel on the shared pool; every worker
    /// holds at most one open file handle at a time.
    ///
    /// # Errors
    ///
    /// Fails with [`ScanError::NotMounted`] for units without a mountpoint,
    /// [`ScanError::RootUnreadable`] when the mountpoint itself cannot be
    /// read, and [`ScanError::Cancelled`] when `cancel` is raised.
    pub fn scan(
        &self,
        unit: &StorageUnit,
        host: &str,
        cancel: &CancelFlag,
    ) -> Result<Manifest, ScanError> {
        let root = unit
            .mountpoint
            .clone()
            .ok_or_else(|| ScanError::NotMounted(unit.name.to_string()))?;

        let captured_at = chrono::Utc::now().timestamp();
        let builder = SharedBuilder::new(ManifestBuilder::new(
            unit.name.clone(),
            host,
            captured_at,
        ));

        let files = Self::discover(&root, &builder)?;
        debug!(unit = %unit.name, files = files.len(), "discovery complete");

        let chunk_size = self.chunk_size;
        thread_pool::run_in_pool(|| {
            files.par_iter().try_for_each(|path| {
                if cancel.is_cancelled() {
                    return Err(ScanError::Cancelled);
                }
                Self::hash_one(path, unit, chunk_size, &builder)
            })
        })?;

        let manifest = builder.seal()?;
        if manifest.is_partial() {
            warn!(
                unit = %unit.name,
                skipped = manifest.skipped.len(),
                "scan produced a partial manifest"
            );
        }
        info!(
            unit = %unit.name,
            files = manifest.file_count(),
            partial = manifest.is_partial(),
            "scan complete"
        );
        Ok(manifest)
    }

    /// Walk the tree and collect every regular file. Unreadable entries
    /// below the root are recorded as skipped; an unreadable root aborts.
    fn discover(root: &Path, builder: &SharedBuilder) -> Result<Vec<PathBuf>, ScanError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(root).follow_links(false) {
            match entry {
                Ok(entry) => {
                    // Symlinks report their own file type here, so links to
                    // files are skipped along with links to directories
                    if entry.file_type().is_file() {
                        files.push(entry.path().to_path_buf());
                    }
                }
                Err(err) => {
                    let failed_path = err.path().map(Path::to_path_buf);
                    match failed_path {
                        Some(path) if path != root => {
                            builder.add_skipped(path, err.to_string())?;
                        }
                        _ => {
                            return Err(ScanError::RootUnreadable {
                                path: root.to_path_buf(),
                                source: err,
                            });
                        }
                    }
                }
            }
        }

        Ok(files)
    }

    /// Hash one file and report the outcome into the builder.
    fn hash_one(
        path: &Path,
        unit: &StorageUnit,
        chunk_size: usize,
        builder: &SharedBuilder,
    ) -> Result<(), ScanError> {
        let hashed = hasher::read_modified(path)
            .and_then(|modified| hasher::hash_file(path, chunk_size).map(|d| (modified, d)));

        match hashed {
            Ok((modified, digest)) => {
                builder.add_file(FileRecord {
                    path: path.to_path_buf(),
                    unit: unit.name.clone(),
                    modified,
                    digest: Some(digest),
                })?;
            }
            Err(err) => {
                debug!(path = %path.display(), %err, "file skipped");
                builder.add_skipped(path.to_path_buf(), err.to_string())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::UnitName;
    use crate::hasher::{DEFAULT_CHUNK_SIZE, hash_bytes};
    use std::fs;
    use tempfile::TempDir;

    fn unit_at(root: &std::path::Path) -> StorageUnit {
        StorageUnit {
            name: UnitName::parse("pool/data").unwrap(),
            used: "1G".to_string(),
            avail: "9G".to_string(),
            refer: "1G".to_string(),
            mountpoint: Some(root.to_path_buf()),
        }
    }

    fn scanner() -> Scanner {
        Scanner::new(DEFAULT_CHUNK_SIZE)
    }

    #[test]
    fn test_scan_collects_all_regular_files() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::create_dir_all(dir.path().join("sub/deep"))?;
        fs::write(dir.path().join("a.txt"), b"hello")?;
        fs::write(dir.path().join("sub/b.txt"), b"world")?;
        fs::write(dir.path().join("sub/deep/c.txt"), b"deep")?;

        let manifest = scanner().scan(&unit_at(dir.path()), "testhost", &CancelFlag::new())?;

        assert_eq!(manifest.file_count(), 3);
        assert!(!manifest.is_partial());
        assert_eq!(manifest.host, "testhost");

        let a = manifest
            .files
            .iter()
            .find(|r| r.path.ends_with("a.txt"))
            .unwrap();
        assert_eq!(a.digest.as_deref(), Some(hash_bytes(b"hello").as_str()));
        assert!(a.modified > 0);
        Ok(())
    }

    #[test]
    fn test_scan_ignores_directories_and_symlinks() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::create_dir_all(dir.path().join("real"))?;
        fs::write(dir.path().join("real/file.txt"), b"content")?;
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("linkdir"))?;
        std::os::unix::fs::symlink(
            dir.path().join("real/file.txt"),
            dir.path().join("linkfile"),
        )?;

        let manifest = scanner().scan(&unit_at(dir.path()), "h", &CancelFlag::new())?;

        // Only the real file; neither link is followed or recorded
        assert_eq!(manifest.file_count(), 1);
        assert!(manifest.files[0].path.ends_with("real/file.txt"));
        Ok(())
    }

    #[test]
    fn test_scan_unmounted_unit_fails() {
        let mut unit = unit_at(std::path::Path::new("/tmp"));
        unit.mountpoint = None;

        let err = scanner()
            .scan(&unit, "h", &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, ScanError::NotMounted(_)));
    }

    #[test]
    fn test_scan_missing_root_fails() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("nonexistent");

        let err = scanner()
            .scan(&unit_at(&gone), "h", &CancelFlag::new())
            .unwrap_err();
        assert!(matches!(err, ScanError::RootUnreadable { .. }));
    }

    #[test]
    #[cfg(unix)]
    fn test_unreadable_file_marks_manifest_partial() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new()?;
        fs::write(dir.path().join("ok.txt"), b"fine")?;
        let locked = dir.path().join("locked.txt");
        fs::write(&locked, b"secret")?;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))?;

        // Running as root the permission bits don't bite; skip the assertions
        let still_readable = fs::read(&locked).is_ok();

        let manifest = scanner().scan(&unit_at(dir.path()), "h", &CancelFlag::new())?;

        // Restore permissions so the tempdir can be cleaned up
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644))?;

        if still_readable {
            return Ok(());
        }

        assert!(manifest.is_partial());
        assert_eq!(manifest.file_count(), 1);
        assert_eq!(manifest.skipped.len(), 1);
        assert!(manifest.skipped[0].path.ends_with("locked.txt"));
        Ok(())
    }

    #[test]
    fn test_scan_twice_diffs_clean() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("stable.txt"), b"unchanging")?;

        let unit = unit_at(dir.path());
        let first = scanner().scan(&unit, "h", &CancelFlag::new())?;
        let second = scanner().scan(&unit, "h", &CancelFlag::new())?;

        let d = crate::manifest::diff::diff(&first, &second)?;
        assert!(d.is_clean());
        Ok(())
    }

    #[test]
    fn test_cancelled_scan_returns_cancelled() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("a.txt"), b"x")?;

        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = scanner()
            .scan(&unit_at(dir.path()), "h", &cancel)
            .unwrap_err();
        assert!(matches!(err, ScanError::Cancelled));
        Ok(())
    }
}
