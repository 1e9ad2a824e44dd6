//! Export command implementation
//!
//! Writes the active store to the sync directory. Extensions are never
//! installed or uninstalled by an export.

use std::path::Path;

use cfgsync_core::ConfigImporter;
use cfgsync_store::Codec;
use colored::Colorize;

use super::{comparer, print_outcome};
use crate::cli::FilterArgs;
use crate::context::Project;
use crate::error::Result;
use crate::preview;

/// Run the export command
pub fn run_export(
    cwd: &Path,
    active: Option<&Path>,
    dir: Option<&Path>,
    format: Option<Codec>,
    filters: &FilterArgs,
    yes: bool,
) -> Result<()> {
    let mut project = Project::load(cwd, active)?;
    project.override_sync(cwd, dir, format);

    let source = project.active_store(filters);
    let target = project.sync_store(filters)?;

    let mut preview_comparer = comparer(&project.settings, &source, &target);
    let changelist = preview_comparer.create_changelist()?;
    if !changelist.has_changes() {
        println!("{} Nothing to export.", "OK".green().bold());
        return Ok(());
    }

    println!(
        "{} {} -> {} ({})",
        "Export".blue().bold(),
        project.settings.active_dir.display().to_string().yellow(),
        project.settings.sync_dir.display().to_string().yellow(),
        project.settings.format.to_string().cyan()
    );
    println!();
    print!("{}", preview::render_list(changelist));
    println!();

    preview::confirm("Export these changes?", yes)?;

    let lock = project.lock();
    let mut exporter = ConfigImporter::new(comparer(&project.settings, &source, &target), &lock);
    let outcome = exporter.import()?;
    print_outcome(&outcome, "Export complete");
    Ok(())
}
