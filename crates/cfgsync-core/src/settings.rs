//! Settings resolution with layered merge
//!
//! [`SettingsResolver`] loads `cfgsync` settings from up to three TOML files,
//! later layers overriding earlier ones:
//!
//! 1. Global defaults (`<config_dir>/cfgsync/config.toml`)
//! 2. Project settings (`cfgsync.toml` in the project root)
//! 3. Local overrides (`cfgsync.local.toml`), not meant to be committed
//!
//! Scalars are replaced, `exclude` lists are concatenated without
//! duplicates, and the `[adjust]` and `[extensions]` tables merge by key.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cfgsync_store::Codec;
use serde::Deserialize;

use crate::filter::Adjustment;
use crate::{Error, Result};

/// Project settings file name
pub const SETTINGS_FILE: &str = "cfgsync.toml";

/// Local, uncommitted overrides
pub const LOCAL_SETTINGS_FILE: &str = "cfgsync.local.toml";

/// Directory holding the lock files, relative to the active store.
pub const DEFAULT_LOCK_DIR: &str = ".cfgsync-lock";

/// One settings file as written on disk.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsLayer {
    active_dir: Option<PathBuf>,
    sync_dir: Option<PathBuf>,
    format: Option<Codec>,
    lock_dir: Option<PathBuf>,
    rename_key: Option<String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    adjust: BTreeMap<String, toml::Value>,
    #[serde(default)]
    extensions: ExtensionCommands,
}

/// Shell commands run when extensions are installed or uninstalled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionCommands {
    pub install: Option<String>,
    pub uninstall: Option<String>,
}

/// The effective settings after merging every layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Store the running system reads; the import target
    pub active_dir: PathBuf,
    /// Exported store; the import source
    pub sync_dir: PathBuf,
    /// Codec used when writing the sync directory
    pub format: Codec,
    lock_dir: Option<PathBuf>,
    /// Top-level key pairing deletes and creates into renames
    pub rename_key: Option<String>,
    /// Record name patterns hidden from synchronization
    pub exclude: Vec<String>,
    /// Forced module states
    pub adjust: BTreeMap<String, Adjustment>,
    pub extensions: ExtensionCommands,
}

impl Settings {
    /// Defaults for a project rooted at `root`.
    pub fn defaults(root: &Path) -> Self {
        Self {
            active_dir: root.join("config").join("active"),
            sync_dir: root.join("config").join("sync"),
            format: Codec::default(),
            lock_dir: None,
            rename_key: None,
            exclude: Vec::new(),
            adjust: BTreeMap::new(),
            extensions: ExtensionCommands::default(),
        }
    }

    /// Directory for lock files, `<active_dir>/.cfgsync-lock` unless set.
    pub fn lock_dir(&self) -> PathBuf {
        self.lock_dir
            .clone()
            .unwrap_or_else(|| self.active_dir.join(DEFAULT_LOCK_DIR))
    }

    pub fn set_lock_dir(&mut self, dir: impl Into<PathBuf>) {
        self.lock_dir = Some(dir.into());
    }

    fn merge(&mut self, layer: SettingsLayer, root: &Path, path: &Path) -> Result<()> {
        if let Some(dir) = layer.active_dir {
            self.active_dir = root.join(dir);
        }
        if let Some(dir) = layer.sync_dir {
            self.sync_dir = root.join(dir);
        }
        if let Some(format) = layer.format {
            self.format = format;
        }
        if let Some(dir) = layer.lock_dir {
            self.lock_dir = Some(root.join(dir));
        }
        if let Some(key) = layer.rename_key {
            self.rename_key = Some(key);
        }
        for pattern in layer.exclude {
            if !self.exclude.contains(&pattern) {
                self.exclude.push(pattern);
            }
        }
        for (name, value) in layer.adjust {
            let adjustment = parse_adjustment(&value).map_err(|message| Error::Settings {
                path: path.to_path_buf(),
                message: format!("adjust.{name}: {message}"),
            })?;
            self.adjust.insert(name, adjustment);
        }
        if layer.extensions.install.is_some() {
            self.extensions.install = layer.extensions.install;
        }
        if layer.extensions.uninstall.is_some() {
            self.extensions.uninstall = layer.extensions.uninstall;
        }
        Ok(())
    }
}

fn parse_adjustment(value: &toml::Value) -> std::result::Result<Adjustment, String> {
    match value {
        toml::Value::Integer(weight) => Ok(Adjustment::Enable(*weight)),
        toml::Value::String(s) => s.parse(),
        toml::Value::Boolean(false) => Ok(Adjustment::Disable),
        other => Err(format!("expected a weight or \"disabled\", got {other}")),
    }
}

/// Resolves settings by merging the global, project and local layers.
pub struct SettingsResolver {
    root: PathBuf,

    /// Override for the global config directory (used for testing).
    /// When `None`, `dirs::config_dir()` is used.
    global_config_dir_override: Option<PathBuf>,
}

impl SettingsResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            global_config_dir_override: None,
        }
    }

    /// Use `global_config_dir` instead of the user's config directory.
    pub fn with_global_config_dir(root: impl Into<PathBuf>, global_config_dir: PathBuf) -> Self {
        Self {
            root: root.into(),
            global_config_dir_override: Some(global_config_dir),
        }
    }

    fn global_config_dir(&self) -> Option<PathBuf> {
        if let Some(ref override_dir) = self.global_config_dir_override {
            return Some(override_dir.clone());
        }
        dirs::config_dir().map(|d| d.join("cfgsync"))
    }

    /// Merge every layer that exists. Missing layers are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Settings`] when a layer is not valid TOML or holds an
    /// unknown key or a bad value.
    pub fn resolve(&self) -> Result<Settings> {
        let mut settings = Settings::defaults(&self.root);

        let mut layers = Vec::new();
        if let Some(global_dir) = self.global_config_dir() {
            layers.push(("global", global_dir.join("config.toml")));
        }
        layers.push(("project", self.root.join(SETTINGS_FILE)));
        layers.push(("local", self.root.join(LOCAL_SETTINGS_FILE)));

        for (layer_name, path) in layers {
            if !path.is_file() {
                tracing::debug!(layer = layer_name, ?path, "No settings found, skipping");
                continue;
            }
            tracing::debug!(layer = layer_name, ?path, "Loading settings");
            let content = fs::read_to_string(&path)?;
            let layer: SettingsLayer = toml::from_str(&content).map_err(|e| Error::Settings {
                path: path.clone(),
                message: e.message().to_string(),
            })?;
            settings.merge(layer, &self.root, &path)?;
        }

        Ok(settings)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn has_config(&self) -> bool {
        self.root.join(SETTINGS_FILE).is_file()
    }

    pub fn has_local_overrides(&self) -> bool {
        self.root.join(LOCAL_SETTINGS_FILE).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn isolated(temp: &TempDir) -> SettingsResolver {
        SettingsResolver::with_global_config_dir(temp.path(), temp.path().join("no-global"))
    }

    #[test]
    fn resolve_returns_defaults_when_no_settings_exist() {
        let temp = TempDir::new().unwrap();
        let resolver = isolated(&temp);

        assert!(!resolver.has_config());
        assert!(!resolver.has_local_overrides());

        let settings = resolver.resolve().unwrap();
        assert_eq!(settings, Settings::defaults(temp.path()));
        assert_eq!(
            settings.lock_dir(),
            temp.path().join("config/active").join(DEFAULT_LOCK_DIR)
        );
    }

    #[test]
    fn resolve_loads_project_settings() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(SETTINGS_FILE),
            r#"
active_dir = "site/active"
sync_dir = "site/sync"
format = "json"
rename_key = "uuid"
exclude = ["devel.*"]

[adjust]
devel = 0
big_pipe = "disabled"

[extensions]
install = "drush en -y $CFGSYNC_EXTENSIONS"
"#,
        )
        .unwrap();

        let settings = isolated(&temp).resolve().unwrap();

        assert_eq!(settings.active_dir, temp.path().join("site/active"));
        assert_eq!(settings.sync_dir, temp.path().join("site/sync"));
        assert_eq!(settings.format, Codec::Json);
        assert_eq!(settings.rename_key.as_deref(), Some("uuid"));
        assert_eq!(settings.exclude, vec!["devel.*"]);
        assert_eq!(settings.adjust["devel"], Adjustment::Enable(0));
        assert_eq!(settings.adjust["big_pipe"], Adjustment::Disable);
        assert!(settings.extensions.install.is_some());
        assert!(settings.extensions.uninstall.is_none());
    }

    #[test]
    fn local_overrides_merge_on_top_of_project_settings() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(SETTINGS_FILE),
            r#"
format = "yml"
exclude = ["system.site"]

[adjust]
devel = 0
"#,
        )
        .unwrap();
        fs::write(
            temp.path().join(LOCAL_SETTINGS_FILE),
            r#"
format = "toml"
exclude = ["system.site", "devel.*"]

[adjust]
devel = "off"
"#,
        )
        .unwrap();

        let settings = isolated(&temp).resolve().unwrap();

        assert_eq!(settings.format, Codec::Toml);
        assert_eq!(settings.exclude, vec!["system.site", "devel.*"]);
        assert_eq!(settings.adjust["devel"], Adjustment::Disable);
    }

    #[test]
    fn global_layer_is_overridden_by_project() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global");
        fs::create_dir_all(&global).unwrap();
        fs::write(global.join("config.toml"), "format = \"json\"\nrename_key = \"uuid\"\n").unwrap();
        fs::write(temp.path().join(SETTINGS_FILE), "format = \"toml\"\n").unwrap();

        let settings = SettingsResolver::with_global_config_dir(temp.path(), global)
            .resolve()
            .unwrap();

        assert_eq!(settings.format, Codec::Toml);
        assert_eq!(settings.rename_key.as_deref(), Some("uuid"));
    }

    #[test]
    fn invalid_settings_name_the_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(SETTINGS_FILE), "formatt = \"json\"\n").unwrap();

        let err = isolated(&temp).resolve().unwrap_err();
        match err {
            Error::Settings { path, .. } => assert_eq!(path, temp.path().join(SETTINGS_FILE)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_adjustment_value_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(SETTINGS_FILE), "[adjust]\ndevel = \"loud\"\n").unwrap();

        let err = isolated(&temp).resolve().unwrap_err();
        assert!(err.to_string().contains("adjust.devel"), "got: {err}");
    }
}
