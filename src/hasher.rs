//! Streaming file hashing.
//!
//! Files are read in fixed-size chunks and fed into an incremental XXH3-128
//! hasher, so memory use stays bounded regardless of file size. The digest
//! is hex-encoded to 32 characters. A file that disappears or becomes
//! unreadable between discovery and hashing is a routine race on a live
//! filesystem: the error is returned per file and the caller records it as
//! a skipped path instead of aborting the scan.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::UNIX_EPOCH;
use xxhash_rust::xxh3::{Xxh3, xxh3_128};

/// Default read chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Computes the XXH3 128-bit hash of raw bytes.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> String {
    let hash = xxh3_128(data);
    format!("{hash:032x}")
}

/// Computes a file's content digest by streaming it in `chunk_size` chunks.
///
/// The digest depends only on the file's byte content, never on the chunk
/// size used to read it.
///
/// # Errors
///
/// Returns the underlying I/O error if the file cannot be opened or read.
pub fn hash_file(path: &Path, chunk_size: usize) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Xxh3::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let hash = hasher.digest128();
    Ok(format!("{hash:032x}"))
}

/// Reads a file's modification time as unix seconds.
///
/// The metadata read can race with deletion just like the content read, and
/// fails the same way.
///
/// # Errors
///
/// Returns the underlying I/O error if the metadata cannot be read.
pub fn read_modified(path: &Path) -> std::io::Result<i64> {
    let modified = std::fs::metadata(path)?.modified()?;
    // Pre-epoch mtimes map to negative seconds
    let secs = match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_secs()).unwrap_or(i64::MAX),
    };
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_hash_bytes_deterministic() {
        let hash1 = hash_bytes(b"Hello, World!");
        let hash2 = hash_bytes(b"Hello, World!");
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 32);
        assert_ne!(hash1, hash_bytes(b"different"));
    }

    #[test]
    fn test_hash_file_matches_hash_bytes() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("test.txt");
        std::fs::write(&path, b"Test content for hashing")?;

        assert_eq!(
            hash_file(&path, DEFAULT_CHUNK_SIZE)?,
            hash_bytes(b"Test content for hashing")
        );
        Ok(())
    }

    #[test]
    fn test_hash_file_chunk_size_independent() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("blob.bin");
        let content: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content)?;

        let reference = hash_bytes(&content);
        for chunk_size in [1, 7, 4096, 65536, 1_000_000] {
            assert_eq!(hash_file(&path, chunk_size)?, reference);
        }
        Ok(())
    }

    #[test]
    fn test_hash_empty_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("empty");
        std::fs::write(&path, b"")?;

        assert_eq!(hash_file(&path, DEFAULT_CHUNK_SIZE)?, hash_bytes(b""));
        Ok(())
    }

    #[test]
    fn test_hash_missing_file() {
        let err = hash_file(Path::new("/nonexistent/file"), DEFAULT_CHUNK_SIZE).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_read_modified() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("m.txt");
        std::fs::write(&path, b"x")?;

        let mtime = read_modified(&path)?;
        assert!(mtime > 0);
        assert!(read_modified(Path::new("/nonexistent/file")).is_err());
        Ok(())
    }
}
