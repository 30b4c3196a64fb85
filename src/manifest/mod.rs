//! Point-in-time manifests and their builder.
//!
//! A [`Manifest`] is the immutable record of one scan: every regular file
//! under a storage unit's mountpoint together with its content digest and
//! modification time, plus any paths that could not be hashed. Manifests
//! are produced exclusively through [`ManifestBuilder::seal`], which is the
//! only way the accumulation phase ends; after sealing nothing can be added.

/// Manifest comparison (added / removed / modified / unchanged).
pub mod diff;
/// Durable manifest persistence with a versioned binary format.
pub mod store;

use crate::catalog::UnitName;
use crate::errors::ManifestError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Current manifest schema version.
pub const MANIFEST_VERSION: u32 = 1;

/// One regular file observed during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path of the file at scan time.
    pub path: PathBuf,
    /// Name of the unit this file was scanned under.
    pub unit: UnitName,
    /// Filesystem modification time, unix seconds, read at scan time.
    pub modified: i64,
    /// Hex-encoded content digest. `None` only while hashing is still in
    /// flight; the builder refuses records in that state, so a persisted
    /// manifest never contains one.
    pub digest: Option<String>,
}

/// A path that could not be hashed during a scan, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    /// The path that failed.
    pub path: PathBuf,
    /// Human-readable failure reason.
    pub reason: String,
}

/// Immutable point-in-time record of a storage unit's file tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Schema version for future compatibility.
    pub version: u32,
    /// The unit that was scanned.
    pub unit: UnitName,
    /// Scan start time, unix seconds.
    pub captured_at: i64,
    /// Hostname of the machine that performed the scan.
    pub host: String,
    /// File records in discovery order. At most one record per path; the
    /// order carries no meaning but is stable across serialization.
    pub files: Vec<FileRecord>,
    /// Paths that could not be hashed. Non-empty means the manifest is
    /// partial and must not back a consistency verdict on its own.
    pub skipped: Vec<SkippedFile>,
}

impl Manifest {
    /// Whether any file failed to hash during the scan.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }

    /// Number of hashed file records.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Accumulator that assembles file records into a sealed [`Manifest`].
///
/// `seal` consumes the builder, so adding after sealing is unrepresentable
/// for an owned builder. Concurrent scan workers go through
/// [`SharedBuilder`], which reports [`ManifestError::Sealed`] at runtime
/// instead.
#[derive(Debug)]
pub struct ManifestBuilder {
    /// Unit every accepted record must belong to.
    unit: UnitName,
    /// Scan start time, unix seconds.
    captured_at: i64,
    /// Host performing the scan.
    host: String,
    /// Accepted records in arrival order.
    files: Vec<FileRecord>,
    /// Paths already accepted, for duplicate rejection.
    seen: HashSet<PathBuf>,
    /// Paths that failed to hash.
    skipped: Vec<SkippedFile>,
}

impl ManifestBuilder {
    /// Start a manifest for `unit`, captured at `captured_at` on `host`.
    #[must_use]
    pub fn new(unit: UnitName, host: impl Into<String>, captured_at: i64) -> Self {
        Self {
            unit,
            captured_at,
            host: host.into(),
            files: Vec::new(),
            seen: HashSet::new(),
            skipped: Vec::new(),
        }
    }

    /// Accept one hashed file record.
    ///
    /// # Errors
    ///
    /// Rejects records from another unit, records without a digest, and
    /// duplicate paths.
    pub fn add_file(&mut self, record: FileRecord) -> Result<(), ManifestError> {
        if record.unit != self.unit {
            return Err(ManifestError::UnitMismatch {
                path: record.path,
                record_unit: record.unit.to_string(),
                unit: self.unit.to_string(),
            });
        }
        if record.digest.is_none() {
            return Err(ManifestError::MissingDigest { path: record.path });
        }
        if !self.seen.insert(record.path.clone()) {
            return Err(ManifestError::DuplicatePath { path: record.path });
        }
        self.files.push(record);
        Ok(())
    }

    /// Record a path that could not be hashed.
    pub fn add_skipped(&mut self, path: PathBuf, reason: impl Into<String>) {
        self.skipped.push(SkippedFile {
            path,
            reason: reason.into(),
        });
    }

    /// Finish accumulation and produce the immutable manifest.
    #[must_use]
    pub fn seal(self) -> Manifest {
        Manifest {
            version: MANIFEST_VERSION,
            unit: self.unit,
            captured_at: self.captured_at,
            host: self.host,
            files: self.files,
            skipped: self.skipped,
        }
    }

    /// The unit this builder accepts records for.
    #[must_use]
    pub const fn unit(&self) -> &UnitName {
        &self.unit
    }
}

/// Thread-safe handle over one in-progress builder, shared by scan workers.
///
/// All workers report into the same builder behind a mutex. Once any handle
/// seals, later adds fail with [`ManifestError::Sealed`].
#[derive(Debug, Clone)]
pub struct SharedBuilder {
    /// The builder, `None` once sealed.
    inner: Arc<Mutex<Option<ManifestBuilder>>>,
}

impl SharedBuilder {
    /// Wrap a builder for concurrent accumulation.
    #[must_use]
    pub fn new(builder: ManifestBuilder) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(builder))),
        }
    }

    /// Lock the slot, recovering from a poisoned mutex. A worker that
    /// panicked can only have left the builder missing an entry, which the
    /// partial-manifest accounting already tolerates.
    fn lock(&self) -> MutexGuard<'_, Option<ManifestBuilder>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept one hashed file record.
    ///
    /// # Errors
    ///
    /// Same contract as [`ManifestBuilder::add_file`], plus
    /// [`ManifestError::Sealed`] if the manifest was already sealed.
    pub fn add_file(&self, record: FileRecord) -> Result<(), ManifestError> {
        match self.lock().as_mut() {
            Some(builder) => builder.add_file(record),
            None => Err(ManifestError::Sealed),
        }
    }

    /// Record a path that could not be hashed.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Sealed`] if the manifest was already sealed.
    pub fn add_skipped(&self, path: PathBuf, reason: impl Into<String>) -> Result<(), ManifestError> {
        match self.lock().as_mut() {
            Some(builder) => {
                builder.add_skipped(path, reason);
                Ok(())
            }
            None => Err(ManifestError::Sealed),
        }
    }

    /// Take the builder out and seal it.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Sealed`] if another handle sealed first.
    pub fn seal(&self) -> Result<Manifest, ManifestError> {
        self.lock()
            .take()
            .map(ManifestBuilder::seal)
            .ok_or(ManifestError::Sealed)
    }
}
