//! Binary entry point: parse arguments, set up logging, dispatch commands.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use snapguard::cli::{Cli, Commands};
use snapguard::manifest::diff::Verdict;
use snapguard::{SnapguardContext, commands};
use std::process;
use tracing_subscriber::EnvFilter;

/// Exit code for a completed comparison that found an inconsistency.
const EXIT_INCONSISTENT: i32 = 2;

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            process::exit(1);
        }
    }
}

/// Parse the CLI, build the context, and run the selected command.
fn run() -> Result<i32> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let ctx = SnapguardContext::new()?;

    match cli.command {
        Commands::List { snapshots } => {
            commands::list::execute(&ctx, snapshots)?;
        }
        Commands::Scan {
            units,
            all_filesystems,
            output,
        } => {
            commands::scan::execute(&ctx, &units, all_filesystems, output)?;
        }
        Commands::Verify {
            base,
            candidate,
            allow_partial,
            show_unchanged,
        } => {
            let verdict =
                commands::verify::execute(&ctx, &base, &candidate, allow_partial, show_unchanged)?;
            if matches!(verdict, Verdict::Inconsistent { .. }) {
                return Ok(EXIT_INCONSISTENT);
            }
        }
        Commands::Show { manifest, files } => {
            commands::show::execute(&manifest, files)?;
        }
    }

    Ok(0)
}
