//! Error taxonomy for the scan-and-manifest engine.
//!
//! Each stage of the pipeline has its own closed error enum so callers can
//! match on exactly the failure modes that stage produces. Per-file failures
//! during a tree walk are deliberately *not* represented here: they are
//! recorded against the resulting manifest as skipped paths and never abort
//! a scan (see [`crate::scanner`]).

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while querying the storage catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The external storage tool could not be spawned at all.
    #[error("failed to invoke `{command}`: {source}")]
    ToolInvocation {
        /// The command line that was attempted.
        command: String,
        /// The underlying spawn failure.
        #[source]
        source: std::io::Error,
    },

    /// The external storage tool ran but exited unsuccessfully.
    #[error("`{command}` exited with status {code:?}: {stderr}")]
    ToolFailed {
        /// The command line that was run.
        command: String,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Captured standard error output.
        stderr: String,
    },

    /// A unit name does not match the `<filesystem>[@<label>]` grammar.
    #[error("invalid unit name `{name}`: {reason}")]
    InvalidUnitName {
        /// The offending name.
        name: String,
        /// Which grammar rule was violated.
        reason: String,
    },
}

/// Failures that abort a whole tree scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The selected unit has no mountpoint to walk.
    #[error("unit `{0}` is not mounted")]
    NotMounted(String),

    /// The scan root itself could not be read.
    #[error("cannot read scan root {}: {source}", path.display())]
    RootUnreadable {
        /// The mountpoint that failed.
        path: PathBuf,
        /// The underlying walk error.
        #[source]
        source: walkdir::Error,
    },

    /// The caller's cancellation flag was raised mid-scan.
    #[error("scan cancelled")]
    Cancelled,

    /// A builder contract violation while accumulating records.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Contract violations in the manifest builder. These indicate a bug in the
/// calling code, not a runtime condition to recover from.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A record was scanned under a different unit than the builder targets.
    #[error(
        "record for {} belongs to unit `{record_unit}`, builder targets `{unit}`",
        path.display()
    )]
    UnitMismatch {
        /// Path of the offending record.
        path: PathBuf,
        /// Unit the record claims.
        record_unit: String,
        /// Unit the builder was created for.
        unit: String,
    },

    /// A record reached the builder before hashing completed.
    #[error("record for {} has no digest", path.display())]
    MissingDigest {
        /// Path of the offending record.
        path: PathBuf,
    },

    /// The same path was added twice to one manifest.
    #[error("duplicate record for {}", path.display())]
    DuplicatePath {
        /// Path of the offending record.
        path: PathBuf,
    },

    /// The builder was already sealed into a manifest.
    #[error("manifest already sealed")]
    Sealed,
}

/// Failures while persisting or restoring a manifest.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No manifest file at the given location.
    #[error("manifest not found: {}", path.display())]
    NotFound {
        /// The location that was probed.
        path: PathBuf,
    },

    /// The file exists but is not a usable manifest. Recoverable: callers
    /// report "no manifest available" rather than crashing.
    #[error("manifest {} is corrupt: {reason}", path.display())]
    Corrupt {
        /// The unreadable file.
        path: PathBuf,
        /// What failed: truncated header, bad magic, unsupported version,
        /// decompression or decode failure, or a record without a digest.
        reason: String,
    },

    /// A manifest with the same default name already exists. Manifests are
    /// append-only history and are never overwritten in place.
    #[error("manifest already exists: {}", path.display())]
    AlreadyExists {
        /// The colliding location.
        path: PathBuf,
    },

    /// Underlying filesystem failure while reading or writing.
    #[error("manifest store I/O error at {}: {source}", path.display())]
    Io {
        /// The location involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Failures from the manifest comparator.
#[derive(Debug, Error)]
pub enum DiffError {
    /// The two manifests describe different units; comparing them is a
    /// programming error.
    #[error("cannot diff manifests of different units: `{base}` vs `{candidate}`")]
    UnitMismatch {
        /// Unit of the base manifest.
        base: String,
        /// Unit of the candidate manifest.
        candidate: String,
    },
}
