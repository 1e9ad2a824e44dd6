//! cfgsync CLI
//!
//! Exports the active configuration to a sync directory and imports it back.

mod cli;
mod commands;
mod context;
mod error;
mod preview;

use std::path::Path;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};
use commands::import::ImportArgs;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let result = if verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };
    if let Err(e) = result {
        eprintln!("{}: failed to set up logging: {e}", "warning".yellow().bold());
    }
    tracing::debug!("Verbose mode enabled");
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir()?;
    match cli.command {
        Some(cmd) => execute_command(&cwd, cli.active.as_deref(), cmd),
        None => {
            // No command provided - show help hint
            println!("{} configuration sync", "cfgsync".green().bold());
            println!();
            println!("Run {} for available commands.", "cfgsync --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(cwd: &Path, active: Option<&Path>, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Export {
            dir,
            format,
            filters,
            yes,
        } => commands::run_export(cwd, active, dir.as_deref(), format, &filters, yes),
        Commands::Import {
            dir,
            preview,
            partial,
            filters,
            yes,
        } => {
            let args = ImportArgs {
                preview: Some(preview),
                partial,
                filters,
                yes,
            };
            commands::run_import(cwd, active, dir.as_deref(), &args)
        }
        Commands::Status { dir, filters, json } => {
            commands::run_status(cwd, active, dir.as_deref(), &filters, json)
        }
    }
}
