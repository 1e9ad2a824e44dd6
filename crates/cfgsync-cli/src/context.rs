//! Project context detection
//!
//! Finds the project root from any directory below it, so commands work the
//! same wherever they are run, then resolves the settings for that project
//! and applies command-line overrides.

use std::path::{Path, PathBuf};

use cfgsync_core::settings::SETTINGS_FILE;
use cfgsync_core::{
    CoreExtensionFilter, ExcludeFilter, FileLock, FilterChain, FilteredStore, Settings,
    SettingsResolver,
};
use cfgsync_extensions::CommandHandler;
use cfgsync_store::{Codec, FileStore};

use crate::cli::FilterArgs;
use crate::error::Result;

/// Walk up from `cwd` to the nearest directory holding `cfgsync.toml`.
///
/// Falls back to `cwd` itself when no settings file is found.
pub fn find_root(cwd: &Path) -> PathBuf {
    let mut current = cwd.to_path_buf();
    loop {
        if current.join(SETTINGS_FILE).is_file() {
            return current;
        }
        if !current.pop() {
            return cwd.to_path_buf();
        }
    }
}

/// Resolved settings plus the stores and filters built from them.
#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub settings: Settings,
}

impl Project {
    /// Detect the project around `cwd` and apply the global overrides.
    pub fn load(cwd: &Path, active: Option<&Path>) -> Result<Self> {
        let root = find_root(cwd);
        tracing::debug!(root = %root.display(), "Detected project root");

        let mut settings = SettingsResolver::new(&root).resolve()?;
        if let Some(active) = active {
            settings.active_dir = cwd.join(active);
        }
        Ok(Self { root, settings })
    }

    /// Point the sync directory somewhere else and/or change its format.
    pub fn override_sync(&mut self, cwd: &Path, dir: Option<&Path>, format: Option<Codec>) {
        if let Some(dir) = dir {
            self.settings.sync_dir = cwd.join(dir);
        }
        if let Some(format) = format {
            self.settings.format = format;
        }
    }

    /// The sync directory store, seen through every filter.
    ///
    /// Adjustments apply here: reading forces them into the manifest and
    /// writing keeps them out of it.
    pub fn sync_store(&self, args: &FilterArgs) -> Result<FilteredStore> {
        let base = FileStore::with_codec(&self.settings.sync_dir, self.settings.format);
        let chain = self.exclude_chain(args).with(self.core_extension_filter(args)?);
        Ok(FilteredStore::new(Box::new(base), chain))
    }

    /// The active store; excluded records are hidden but never adjusted.
    pub fn active_store(&self, args: &FilterArgs) -> FilteredStore {
        let base = FileStore::new(&self.settings.active_dir);
        FilteredStore::new(Box::new(base), self.exclude_chain(args))
    }

    pub fn lock(&self) -> FileLock {
        FileLock::new(self.settings.lock_dir())
    }

    /// Handler running the configured extension commands, if any.
    pub fn extension_handler(&self) -> Option<CommandHandler> {
        let handler = CommandHandler::new(
            self.settings.extensions.install.clone(),
            self.settings.extensions.uninstall.clone(),
        )
        .with_working_dir(&self.root);
        handler.is_configured().then_some(handler)
    }

    fn exclude_chain(&self, args: &FilterArgs) -> FilterChain {
        let mut patterns = self.settings.exclude.clone();
        for pattern in &args.exclude {
            if !patterns.contains(pattern) {
                patterns.push(pattern.clone());
            }
        }
        if patterns.is_empty() {
            FilterChain::new()
        } else {
            FilterChain::new().with(ExcludeFilter::new(patterns))
        }
    }

    fn core_extension_filter(&self, args: &FilterArgs) -> Result<CoreExtensionFilter> {
        let mut adjust = self.settings.adjust.clone();
        let from_args = CoreExtensionFilter::from_specs(&args.adjust)?;
        adjust.extend(
            from_args
                .adjustments(cfgsync_extensions::ExtensionKind::Module)
                .iter()
                .map(|(name, adjustment)| (name.clone(), *adjustment)),
        );
        Ok(CoreExtensionFilter::new(adjust))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgsync_core::Adjustment;
    use cfgsync_core::StorageFilter;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn find_root_walks_up_to_settings() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(SETTINGS_FILE), "").unwrap();
        let nested = temp.path().join("web/modules/custom");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_root(&nested), temp.path());
    }

    #[test]
    fn find_root_falls_back_to_cwd() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_root(&nested), nested);
    }

    #[test]
    fn overrides_apply_on_top_of_settings() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(SETTINGS_FILE),
            "sync_dir = \"exported\"\nexclude = [\"devel.*\"]\n\n[adjust]\ndevel = 0\n",
        )
        .unwrap();

        let mut project = Project::load(temp.path(), Some(Path::new("live"))).unwrap();
        project.override_sync(temp.path(), None, Some(Codec::Json));

        assert_eq!(project.settings.active_dir, temp.path().join("live"));
        assert_eq!(project.settings.sync_dir, temp.path().join("exported"));
        assert_eq!(project.settings.format, Codec::Json);

        let args = FilterArgs {
            adjust: vec!["devel=off".to_string()],
            exclude: vec!["system.*".to_string()],
        };
        let filter = project.core_extension_filter(&args).unwrap();
        assert_eq!(
            filter.adjustments(cfgsync_extensions::ExtensionKind::Module)["devel"],
            Adjustment::Disable
        );
        assert_eq!(project.exclude_chain(&args).names(), vec!["exclude"]);
        assert_eq!(filter.name(), "core_extension");
    }

    #[test]
    fn no_handler_without_commands() {
        let temp = TempDir::new().unwrap();
        let project = Project::load(temp.path(), None).unwrap();
        assert!(project.extension_handler().is_none());
    }
}
