#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # Snapguard - ZFS Backup Consistency Scanner
//!
//! Snapguard verifies that a backup of a ZFS filesystem or snapshot is
//! byte-identical to its source, and that no silent corruption has crept in
//! since. It does so by recursively hashing every regular file under a
//! storage unit's mountpoint into an immutable point-in-time manifest,
//! persisting manifests as append-only history, and diffing two manifests
//! of the same unit into a consistency verdict.
//!
//! ## Architecture
//!
//! - [`catalog`]: Storage unit enumeration through the external `zfs` tool
//! - [`hasher`]: Streaming per-file content hashing
//! - [`scanner`]: Recursive tree walk with parallel hashing
//! - [`manifest`]: Manifest model, builder, persistence, and comparison
//! - [`config`]: Configuration parsing and defaults
//! - [`commands`]: CLI command implementations
//! - [`errors`]: Closed error taxonomy per pipeline stage
//! - [`utils`]: Serialization and thread pool helpers
//!
//! ## Example
//!
//! ```no_run
//! use snapguard::catalog::ZfsCatalog;
//! use snapguard::scanner::{CancelFlag, Scanner};
//! use snapguard::manifest::diff;
//!
//! # fn main() -> anyhow::Result<()> {
//! let catalog = ZfsCatalog::new("zfs");
//! let units = catalog.list_filesystems()?;
//! let unit = units.iter().next().expect("no filesystems");
//!
//! let scanner = Scanner::new(4096);
//! let manifest = scanner.scan(unit, "backuphost", &CancelFlag::new())?;
//! let report = diff::diff(&manifest, &manifest)?;
//! assert!(report.is_clean());
//! # Ok(())
//! # }
//! ```

/// Storage unit catalog backed by the external storage tool.
pub mod catalog;

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Commands module containing all CLI command implementations.
pub mod commands;

/// Configuration parsing and defaults.
pub mod config;

/// Error taxonomy for every pipeline stage.
pub mod errors;

/// Streaming file hashing.
pub mod hasher;

/// Manifest model, builder, persistence, and comparison.
pub mod manifest;

/// Recursive tree scanning with parallel hashing.
pub mod scanner;

/// Utility functions and helpers.
pub mod utils;

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Current version of the snapguard binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file path relative to home directory.
pub const DEFAULT_CONFIG_PATH: &str = ".config/snapguard/config.toml";

/// Central context for all snapguard operations.
///
/// Holds the loaded configuration and where it came from. Commands take a
/// context rather than reading ambient globals, so tests can construct one
/// against a temporary directory.
#[derive(Debug, Clone)]
pub struct SnapguardContext {
    /// Path to the configuration file.
    pub config_path: PathBuf,

    /// Loaded configuration settings.
    pub config: config::Config,
}

impl SnapguardContext {
    /// Creates a context by loading the configuration from the default
    /// path, honoring the `SNAPGUARD_CONFIG_PATH` override.
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined or the
    /// configuration file cannot be parsed.
    pub fn new() -> Result<Self> {
        let config_path = if let Ok(path) = std::env::var("SNAPGUARD_CONFIG_PATH") {
            PathBuf::from(path)
        } else {
            let home = dirs::home_dir().context("Could not find home directory")?;
            home.join(DEFAULT_CONFIG_PATH)
        };

        let config = config::Config::load(&config_path)?;
        utils::thread_pool::configure_from_config(&config);

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Creates a context with an explicit config path, for tests.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be loaded.
    pub fn new_explicit(config_path: PathBuf) -> Result<Self> {
        let config = config::Config::load(&config_path)?;
        Ok(Self {
            config_path,
            config,
        })
    }

    /// The catalog configured for this context.
    #[must_use]
    pub fn catalog(&self) -> catalog::ZfsCatalog {
        catalog::ZfsCatalog::new(self.config.core.zfs_path.clone())
    }

    /// The manifest store configured for this context, optionally rooted at
    /// an overriding directory.
    #[must_use]
    pub fn store(&self, dir_override: Option<PathBuf>) -> manifest::store::ManifestStore {
        let dir = dir_override.unwrap_or_else(|| self.config.core.manifest_dir.clone());
        manifest::store::ManifestStore::new(dir, self.config.core.compression_level)
    }

    /// The scanner configured for this context.
    #[must_use]
    pub const fn scanner(&self) -> scanner::Scanner {
        scanner::Scanner::new(self.config.scan.chunk_size)
    }
}
