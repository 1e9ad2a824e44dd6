//! Status command implementation
//!
//! Shows what an import would change without touching anything.

use std::path::Path;

use colored::Colorize;

use super::comparer;
use crate::cli::FilterArgs;
use crate::context::Project;
use crate::error::Result;
use crate::preview;

/// Run the status command
pub fn run_status(
    cwd: &Path,
    active: Option<&Path>,
    dir: Option<&Path>,
    filters: &FilterArgs,
    json: bool,
) -> Result<()> {
    let mut project = Project::load(cwd, active)?;
    project.override_sync(cwd, dir, None);

    let source = project.sync_store(filters)?;
    let target = project.active_store(filters);
    let mut comparer = comparer(&project.settings, &source, &target);
    let changelist = comparer.create_changelist()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&preview::to_json(changelist))?);
        return Ok(());
    }

    println!(
        "{} {} -> {}",
        "Status".blue().bold(),
        project.settings.sync_dir.display().to_string().yellow(),
        project.settings.active_dir.display().to_string().yellow()
    );
    println!();

    if !changelist.has_changes() {
        println!("{} Nothing to import.", "OK".green().bold());
        return Ok(());
    }

    print!("{}", preview::render_list(changelist));
    println!();
    println!("{}", changelist.summary());
    println!("Run {} to apply these changes.", "cfgsync import".cyan());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgsync_test_utils::TestSite;
    use serde_json::json;

    #[test]
    fn status_does_not_modify_anything() {
        let site = TestSite::new();
        site.seed_sync(&[("system.site", json!({"name": "Example"}))]);
        site.seed_active(&[("stale.record", json!({}))]);

        run_status(site.root(), None, None, &FilterArgs::default(), false).unwrap();
        run_status(site.root(), None, None, &FilterArgs::default(), true).unwrap();

        site.assert_record_exists("config/active/stale.record.yml");
        site.assert_record_not_exists("config/active/system.site.yml");
    }
}
