//! [`TestSite`] builder for end-to-end scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use cfgsync_store::{Codec, ConfigStore, FileStore, Record};
use serde_json::Value;
use tempfile::TempDir;

use crate::records::{record, seed};

/// A temporary project with `config/active` and `config/sync` stores, laid
/// out the way the default settings expect.
///
/// # Example
///
/// ```rust,no_run
/// use cfgsync_test_utils::TestSite;
/// use serde_json::json;
///
/// let site = TestSite::new();
/// site.seed_active(&[("system.site", json!({"name": "Example"}))]);
/// site.assert_record_exists("config/active/system.site.yml");
/// ```
pub struct TestSite {
    temp_dir: TempDir,
}

impl Default for TestSite {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSite {
    /// Create an empty temporary project.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn active_dir(&self) -> PathBuf {
        self.root().join("config").join("active")
    }

    pub fn sync_dir(&self) -> PathBuf {
        self.root().join("config").join("sync")
    }

    /// YAML store over the active directory.
    pub fn active(&self) -> FileStore {
        FileStore::new(self.active_dir())
    }

    pub fn sync(&self) -> FileStore {
        FileStore::new(self.sync_dir())
    }

    pub fn sync_with(&self, codec: Codec) -> FileStore {
        FileStore::with_codec(self.sync_dir(), codec)
    }

    pub fn seed_active(&self, records: &[(&str, Value)]) {
        seed(&self.active(), records);
    }

    pub fn seed_sync(&self, records: &[(&str, Value)]) {
        seed(&self.sync(), records);
    }

    /// Write `cfgsync.toml` in the project root.
    pub fn write_settings(&self, content: &str) {
        fs::write(self.root().join("cfgsync.toml"), content).unwrap();
    }

    /// Read a record back from the active store.
    pub fn active_record(&self, name: &str) -> Option<Record> {
        self.active().read(name).unwrap()
    }

    /// Assert the active store holds `name` with exactly `expected`.
    ///
    /// # Panics
    /// Panics if the record is missing or differs.
    pub fn assert_active_record(&self, name: &str, expected: Value) {
        let actual = self
            .active_record(name)
            .unwrap_or_else(|| panic!("Expected record to exist in active store: {name}"));
        assert_eq!(actual, record(expected), "Record {name} differs");
    }

    /// Assert that `path` (relative to the project root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_record_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `path` (relative to the project root) does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_record_not_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }
}
