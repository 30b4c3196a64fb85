//! Durable manifest persistence.
//!
//! On-disk layout: an 8-byte magic, a little-endian u32 format version,
//! then a zstd-compressed bincode payload. The explicit header lets a
//! future reader detect an incompatible layout and fail cleanly instead of
//! misparsing, and gives [`ManifestStore::load`] a single well-defined
//! notion of corruption: anything between "file exists" and "payload decodes
//! to a digest-complete manifest" is [`StoreError::Corrupt`].
//!
//! Writes go through a temporary file in the destination directory followed
//! by an atomic rename, so a reader never observes a half-written manifest
//! as valid. Manifest files are append-only history: a name collision is an
//! error, never an overwrite.

use crate::errors::StoreError;
use crate::manifest::{MANIFEST_VERSION, Manifest};
use crate::utils::serialization;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zstd::stream::{decode_all, encode_all};

/// Magic bytes opening every manifest file.
pub const MANIFEST_MAGIC: [u8; 8] = *b"SNAPGRD\0";

/// On-disk container format version.
pub const STORE_FORMAT_VERSION: u32 = 1;

/// File extension for persisted manifests.
pub const MANIFEST_EXT: &str = "scan";

/// Header length: magic plus version word.
const HEADER_LEN: usize = MANIFEST_MAGIC.len() + 4;

/// Persists manifests under a directory and restores them.
pub struct ManifestStore {
    /// Directory holding manifest files.
    dir: PathBuf,
    /// Zstd compression level for the payload.
    compression_level: i32,
}

impl ManifestStore {
    /// Create a store rooted at `dir`.
    #[must_use]
    pub fn new(dir: PathBuf, compression_level: i32) -> Self {
        Self {
            dir,
            compression_level,
        }
    }

    /// Default file name for a manifest: the unit name with path separators
    /// replaced, joined with the capture timestamp. Distinct manifests of
    /// the same unit differ in `captured_at` and so never collide.
    #[must_use]
    pub fn default_file_name(manifest: &Manifest) -> String {
        let safe_unit = manifest.unit.to_string().replace('/', "_");
        format!("{safe_unit}@{}.{MANIFEST_EXT}", manifest.captured_at)
    }

    /// Persist a manifest under its default name.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::AlreadyExists`] on a name collision and
    /// [`StoreError::Io`] on filesystem failures.
    pub fn save(&self, manifest: &Manifest) -> Result<PathBuf, StoreError> {
        let target = self.dir.join(Self::default_file_name(manifest));
        self.save_to(manifest, &target)?;
        Ok(target)
    }

    /// Persist a manifest at an explicit location.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::save`].
    pub fn save_to(&self, manifest: &Manifest, target: &Path) -> Result<(), StoreError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| StoreError::Io { path, source }
        };

        if target.exists() {
            return Err(StoreError::AlreadyExists {
                path: target.to_path_buf(),
            });
        }

        let parent = target.parent().unwrap_or(&self.dir);
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;

        let payload = serialization::serialize(manifest).map_err(|e| StoreError::Io {
            path: target.to_path_buf(),
            source: std::io::Error::other(e),
        })?;
        let compressed =
            encode_all(&payload[..], self.compression_level).map_err(io_err(target))?;

        // Stage in the destination directory so the final rename is atomic
        let mut tmp = NamedTempFile::new_in(parent).map_err(io_err(parent))?;
        tmp.write_all(&MANIFEST_MAGIC).map_err(io_err(target))?;
        tmp.write_all(&STORE_FORMAT_VERSION.to_le_bytes())
            .map_err(io_err(target))?;
        tmp.write_all(&compressed).map_err(io_err(target))?;
        tmp.as_file().sync_all().map_err(io_err(target))?;

        tmp.persist_noclobber(target)
            .map_err(|e| match e.error.kind() {
                std::io::ErrorKind::AlreadyExists => StoreError::AlreadyExists {
                    path: target.to_path_buf(),
                },
                _ => StoreError::Io {
                    path: target.to_path_buf(),
                    source: e.error,
                },
            })?;

        info!(
            path = %target.display(),
            files = manifest.file_count(),
            partial = manifest.is_partial(),
            "manifest saved"
        );
        Ok(())
    }

    /// Restore a manifest from a file.
    ///
    /// # Errors
    ///
    /// Distinguishes three outcomes: success, [`StoreError::NotFound`] when
    /// the file is absent, and [`StoreError::Corrupt`] for everything in
    /// between (truncated header, wrong magic, unsupported format or schema
    /// version, decompression or decode failure, record without a digest).
    pub fn load(path: &Path) -> Result<Manifest, StoreError> {
        let data = std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let corrupt = |reason: String| StoreError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        if data.len() < HEADER_LEN {
            return Err(corrupt(format!(
                "truncated header: {} bytes, need {HEADER_LEN}",
                data.len()
            )));
        }
        if data[..MANIFEST_MAGIC.len()] != MANIFEST_MAGIC {
            return Err(corrupt("bad magic".to_string()));
        }

        let mut version_bytes = [0u8; 4];
        version_bytes.copy_from_slice(&data[MANIFEST_MAGIC.len()..HEADER_LEN]);
        let format_version = u32::from_le_bytes(version_bytes);
        if format_version > STORE_FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported container format version {format_version} (newest known: {STORE_FORMAT_VERSION})"
            )));
        }

        let payload = decode_all(&data[HEADER_LEN..])
            .map_err(|e| corrupt(format!("decompression failed: {e}")))?;
        let manifest: Manifest = serialization::deserialize(&payload)
            .map_err(|e| corrupt(format!("decode failed: {e}")))?;

        if manifest.version > MANIFEST_VERSION {
            return Err(corrupt(format!(
                "unsupported manifest schema version {} (newest known: {MANIFEST_VERSION})",
                manifest.version
            )));
        }
        if let Some(record) = manifest.files.iter().find(|r| r.digest.is_none()) {
            return Err(corrupt(format!(
                "record for {} has no digest",
                record.path.display()
            )));
        }

        debug!(path = %path.display(), files = manifest.file_count(), "manifest loaded");
        Ok(manifest)
    }
}
