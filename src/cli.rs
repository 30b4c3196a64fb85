//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Top-level argument parser.
#[derive(Parser)]
#[command(
    name = "snapguard",
    version = crate::VERSION,
    about = "ZFS backup consistency scanner",
    long_about = "Hashes filesystem trees into point-in-time manifests and \
                  compares them to detect silent corruption in backups"
)]
pub struct Cli {
    /// The selected subcommand.
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging (equivalent to RUST_LOG=debug).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All snapguard subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// List storage units known to the storage subsystem
    List {
        /// List snapshots instead of filesystems
        #[arg(short, long)]
        snapshots: bool,
    },

    /// Scan storage units into manifests
    Scan {
        /// Unit names to scan (e.g. pool/data or pool/data@monday)
        units: Vec<String>,

        /// Scan every mounted filesystem
        #[arg(long, conflicts_with = "units")]
        all_filesystems: bool,

        /// Write manifests into this directory instead of the configured one
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare two manifests and report a consistency verdict
    Verify {
        /// Manifest file capturing the expected state
        base: PathBuf,

        /// Manifest file to check against the base
        candidate: PathBuf,

        /// Issue a verdict even if a manifest is partial
        #[arg(long)]
        allow_partial: bool,

        /// Also list unchanged files
        #[arg(long)]
        show_unchanged: bool,
    },

    /// Print the contents of a persisted manifest
    Show {
        /// Manifest file to inspect
        manifest: PathBuf,

        /// Also list every file record
        #[arg(short, long)]
        files: bool,
    },
}
