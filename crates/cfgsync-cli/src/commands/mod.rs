//! Command implementations for cfgsync-cli

pub mod export;
pub mod import;
pub mod status;

pub use export::run_export;
pub use import::run_import;
pub use status::run_status;

use cfgsync_core::{ImportOutcome, Settings, StorageComparer};
use cfgsync_store::ConfigStore;
use colored::Colorize;

/// A comparer honouring the configured rename key.
fn comparer<'a>(
    settings: &Settings,
    source: &'a dyn ConfigStore,
    target: &'a dyn ConfigStore,
) -> StorageComparer<'a> {
    let comparer = StorageComparer::new(source, target);
    match &settings.rename_key {
        Some(key) => comparer.with_rename_key(key.clone()),
        None => comparer,
    }
}

/// Print what an import run did.
fn print_outcome(outcome: &ImportOutcome, verb: &str) {
    match outcome {
        ImportOutcome::Committed(report) => {
            for action in &report.actions {
                println!("  {} {}", "*".green(), action);
            }
            println!();
            println!("{} {} ({})", "OK".green().bold(), verb, report.summary);
        }
        ImportOutcome::Skipped => {
            println!(
                "{} Another import is already running. Nothing was changed.",
                "warning".yellow().bold()
            );
        }
    }
}
