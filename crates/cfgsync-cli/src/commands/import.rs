//! Import command implementation
//!
//! Applies the sync directory to the active store, running extension
//! commands for modules and themes that appear or disappear.

use std::path::Path;

use cfgsync_core::{ConfigImporter, ImportOptions};
use cfgsync_extensions::ExtensionHandler;
use colored::Colorize;

use super::{comparer, print_outcome};
use crate::cli::{FilterArgs, Preview};
use crate::context::Project;
use crate::error::Result;
use crate::preview;

/// Options for the import command
#[derive(Debug, Clone, Default)]
pub struct ImportArgs {
    pub preview: Option<Preview>,
    pub partial: bool,
    pub filters: FilterArgs,
    pub yes: bool,
}

/// Run the import command
pub fn run_import(
    cwd: &Path,
    active: Option<&Path>,
    dir: Option<&Path>,
    args: &ImportArgs,
) -> Result<()> {
    let mut project = Project::load(cwd, active)?;
    project.override_sync(cwd, dir, None);

    let source = project.sync_store(&args.filters)?;
    let target = project.active_store(&args.filters);

    let mut preview_comparer = comparer(&project.settings, &source, &target);
    let mut changelist = preview_comparer.create_changelist()?.clone();
    if args.partial {
        changelist = changelist.without_deletes();
    }
    if !changelist.has_changes() {
        println!("{} Nothing to import.", "OK".green().bold());
        return Ok(());
    }

    println!(
        "{} {} -> {}",
        "Import".blue().bold(),
        project.settings.sync_dir.display().to_string().yellow(),
        project.settings.active_dir.display().to_string().yellow()
    );
    println!();
    match args.preview {
        Some(Preview::Diff) => print!("{}", preview::render_diff(&changelist, &source, &target)?),
        Some(Preview::List) | None => print!("{}", preview::render_list(&changelist)),
    }
    println!();
    println!("{}", changelist.summary());

    preview::confirm("Import these changes?", args.yes)?;

    let lock = project.lock();
    let handler = project.extension_handler();
    let mut importer = ConfigImporter::new(comparer(&project.settings, &source, &target), &lock)
        .with_options(ImportOptions {
            partial: args.partial,
        });
    if let Some(handler) = &handler {
        importer = importer.with_extensions(handler as &dyn ExtensionHandler);
    } else {
        tracing::debug!("No extension commands configured");
    }

    let outcome = importer.import()?;
    print_outcome(&outcome, "Import complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgsync_test_utils::TestSite;
    use serde_json::json;

    fn yes() -> ImportArgs {
        ImportArgs {
            yes: true,
            ..Default::default()
        }
    }

    #[test]
    fn import_applies_sync_directory() {
        let site = TestSite::new();
        site.seed_sync(&[("system.site", json!({"name": "Example"}))]);
        site.seed_active(&[("stale.record", json!({}))]);

        run_import(site.root(), None, None, &yes()).unwrap();

        site.assert_active_record("system.site", json!({"name": "Example"}));
        site.assert_record_not_exists("config/active/stale.record.yml");
    }

    #[test]
    fn partial_import_keeps_extra_records() {
        let site = TestSite::new();
        site.seed_sync(&[("system.site", json!({"name": "Example"}))]);
        site.seed_active(&[("stale.record", json!({}))]);

        let args = ImportArgs {
            partial: true,
            ..yes()
        };
        run_import(site.root(), None, None, &args).unwrap();

        site.assert_record_exists("config/active/stale.record.yml");
        site.assert_record_exists("config/active/system.site.yml");
    }

    #[test]
    fn excluded_records_are_left_alone() {
        let site = TestSite::new();
        site.seed_sync(&[("system.site", json!({"name": "Example"}))]);
        site.seed_active(&[("devel.settings", json!({"a": 1}))]);

        let args = ImportArgs {
            filters: FilterArgs {
                exclude: vec!["devel.*".to_string()],
                ..Default::default()
            },
            ..yes()
        };
        run_import(site.root(), None, None, &args).unwrap();

        site.assert_active_record("devel.settings", json!({"a": 1}));
    }

    #[test]
    fn nothing_to_import_is_ok() {
        let site = TestSite::new();
        site.seed_sync(&[("system.site", json!({"name": "Example"}))]);
        site.seed_active(&[("system.site", json!({"name": "Example"}))]);

        assert!(run_import(site.root(), None, None, &yes()).is_ok());
    }
}
