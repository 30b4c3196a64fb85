//! CLI command implementations.

/// `list` command: print the storage unit catalog.
pub mod list;
/// `scan` command: hash units into persisted manifests.
pub mod scan;
/// `show` command: inspect a persisted manifest.
pub mod show;
/// `verify` command: diff two manifests into a verdict.
pub mod verify;

use colored::Colorize;

/// Print a success line.
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error line to stderr.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print an informational line.
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a warning line.
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}
