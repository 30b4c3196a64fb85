//! Configuration parsing and defaults.
//!
//! Configuration lives in a TOML file with three sections: `[core]` for
//! paths and the storage tool, `[scan]` for hashing behavior, and
//! `[verify]` for the consistency verdict policy. Every field has a
//! default, so a missing file or empty section is valid.

use crate::hasher::DEFAULT_CHUNK_SIZE;
use crate::manifest::diff::VerdictPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Paths and external tool settings.
    #[serde(default)]
    pub core: CoreConfig,

    /// Scan and hashing settings.
    #[serde(default)]
    pub scan: ScanConfig,

    /// Consistency verdict policy.
    #[serde(default)]
    pub verify: VerifyConfig,
}

/// Paths and external tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Directory where manifests are persisted.
    #[serde(default = "default_manifest_dir")]
    pub manifest_dir: PathBuf,
    /// Name or path of the `zfs` binary.
    #[serde(default = "default_zfs_path")]
    pub zfs_path: String,
    /// Zstd compression level for manifest payloads.
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

/// Scan and hashing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Read chunk size in bytes for streaming hashing.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Worker threads for parallel hashing; 0 means auto.
    #[serde(default)]
    pub parallel_threads: usize,
}

/// Consistency verdict policy. Modified files always break consistency;
/// whether additions and removals do is a deployment decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Treat files only present in the candidate as an inconsistency.
    #[serde(default)]
    pub fail_on_added: bool,
    /// Treat files missing from the candidate as an inconsistency.
    #[serde(default = "default_true")]
    pub fail_on_removed: bool,
    /// Allow verdicts from partial manifests without the CLI override.
    #[serde(default)]
    pub allow_partial: bool,
}

/// Default manifest directory: `~/.snapguard/manifests`.
fn default_manifest_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".snapguard")
        .join("manifests")
}

/// Default storage tool binary name.
fn default_zfs_path() -> String {
    String::from("zfs")
}

/// Default zstd compression level.
const fn default_compression_level() -> i32 {
    3
}

/// Default hashing chunk size.
const fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// Serde default helper.
const fn default_true() -> bool {
    true
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            manifest_dir: default_manifest_dir(),
            zfs_path: default_zfs_path(),
            compression_level: default_compression_level(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            parallel_threads: 0,
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            fail_on_added: false,
            fail_on_removed: true,
            allow_partial: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write the configuration as TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// The verdict policy selected by the `[verify]` section.
    #[must_use]
    pub const fn verdict_policy(&self) -> VerdictPolicy {
        VerdictPolicy {
            fail_on_added: self.verify.fail_on_added,
            fail_on_removed: self.verify.fail_on_removed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.core.zfs_path, "zfs");
        assert_eq!(config.core.compression_level, 3);
        assert_eq!(config.scan.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.scan.parallel_threads, 0);
        assert!(!config.verify.fail_on_added);
        assert!(config.verify.fail_on_removed);
        assert!(!config.verify.allow_partial);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.core.zfs_path, "zfs");
    }

    #[test]
    fn test_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.core.zfs_path = String::from("/usr/local/bin/zfs");
        config.scan.chunk_size = 65536;
        config.verify.fail_on_added = true;
        config.save(&path)?;

        let loaded = Config::load(&path)?;
        assert_eq!(loaded.core.zfs_path, "/usr/local/bin/zfs");
        assert_eq!(loaded.scan.chunk_size, 65536);
        assert!(loaded.verify.fail_on_added);
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scan]\nchunk_size = 8192\n")?;

        let config = Config::load(&path)?;
        assert_eq!(config.scan.chunk_size, 8192);
        assert_eq!(config.core.zfs_path, "zfs");
        assert!(config.verify.fail_on_removed);
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not [valid toml")?;

        assert!(Config::load(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_verdict_policy_mapping() {
        let mut config = Config::default();
        config.verify.fail_on_added = true;
        config.verify.fail_on_removed = false;

        let policy = config.verdict_policy();
        assert!(policy.fail_on_added);
        assert!(!policy.fail_on_removed);
    }
}
