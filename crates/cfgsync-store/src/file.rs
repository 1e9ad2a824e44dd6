//! File-backed store
//!
//! One record is one file named `<name>.<ext>`. The default collection lives
//! in the store root; collection `a.b` lives in the subdirectory `a/b`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::store::{ConfigStore, DEFAULT_COLLECTION, Record};
use crate::validation::{
    validate_collection_name, validate_lookup_name, validate_name, validate_record,
};
use crate::{Codec, Error, Result, io};

/// A store keeping each record in its own file.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    collection: String,
    codec: Codec,
}

impl FileStore {
    /// Create a store rooted at `root`, using YAML files.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_codec(root, Codec::default())
    }

    /// Create a store rooted at `root` using the given codec.
    pub fn with_codec(root: impl Into<PathBuf>, codec: Codec) -> Self {
        Self {
            root: root.into(),
            collection: DEFAULT_COLLECTION.to_string(),
            codec,
        }
    }

    /// The store root shared by all collections.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Directory holding the records of this handle's collection.
    pub fn collection_dir(&self) -> PathBuf {
        self.collection
            .split('.')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |dir, segment| dir.join(segment))
    }

    /// Path of the file holding `name`.
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.collection_dir()
            .join(format!("{}.{}", name, self.codec.extension()))
    }

    /// Path of an existing record, refusing names that would leave the
    /// collection directory.
    fn record_path(&self, name: &str) -> Result<PathBuf> {
        validate_lookup_name(name)?;
        Ok(self.file_path(name))
    }

    fn record_name(&self, file_name: &str) -> Option<String> {
        if file_name.starts_with('.') {
            return None;
        }
        let stem = file_name.strip_suffix(self.codec.extension())?;
        stem.strip_suffix('.')
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }

    fn has_records(&self, dir: &Path) -> Result<bool> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(Error::io(dir, e)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if is_file && self.record_name(&entry.file_name().to_string_lossy()).is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn collect_collections(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::io(dir, e)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| Error::io(dir, e))?;
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let file_name = entry.file_name().to_string_lossy().to_string();
            // Hidden directories hold lock files and editor state. A dot
            // elsewhere cannot be addressed, since `a.b` maps to `a/b`.
            if !is_dir || file_name.contains('.') {
                continue;
            }

            let collection = if prefix.is_empty() {
                file_name
            } else {
                format!("{prefix}.{file_name}")
            };
            let path = entry.path();
            if self.has_records(&path)? {
                out.push(collection.clone());
            }
            self.collect_collections(&path, &collection, out)?;
        }
        Ok(())
    }

    /// Remove empty directories from this collection up to the store root.
    fn prune_empty_dirs(&self) {
        if self.collection.is_empty() {
            return;
        }
        let mut dir = self.collection_dir();
        while dir != self.root {
            // Fails on non-empty directories, which ends the walk
            if fs::remove_dir(&dir).is_err() {
                break;
            }
            tracing::debug!(?dir, "Removed empty collection directory");
            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => break,
            }
        }
    }
}

impl ConfigStore for FileStore {
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.record_path(name)?.is_file())
    }

    fn read(&self, name: &str) -> Result<Option<Record>> {
        let path = self.record_path(name)?;
        match io::read_if_exists(&path)? {
            Some(raw) => self.codec.decode(&raw).map(Some).map_err(|e| e.at_path(&path)),
            None => Ok(None),
        }
    }

    fn write(&self, name: &str, data: &Record) -> Result<()> {
        validate_name(name)?;
        validate_record(name, data)?;
        let content = self.codec.encode(data)?;

        let path = self.file_path(name);
        tracing::debug!(?path, collection = %self.collection, "Writing record");
        io::write_atomic(&path, &content)
    }

    fn delete(&self, name: &str) -> Result<bool> {
        let deleted = io::remove_if_exists(&self.record_path(name)?)?;
        if deleted {
            tracing::debug!(name, collection = %self.collection, "Deleted record");
            self.prune_empty_dirs();
        }
        Ok(deleted)
    }

    fn rename(&self, name: &str, new_name: &str) -> Result<bool> {
        validate_name(new_name)?;
        let from = self.record_path(name)?;
        let to = self.file_path(new_name);
        if !from.is_file() || to.exists() {
            return Ok(false);
        }
        fs::rename(&from, &to).map_err(|e| Error::io(&from, e))?;
        tracing::debug!(name, new_name, collection = %self.collection, "Renamed record");
        Ok(true)
    }

    fn list_all(&self, prefix: &str) -> Result<Vec<String>> {
        let dir = self.collection_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&dir, e))?;
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if let Some(name) = self.record_name(&entry.file_name().to_string_lossy())
                && name.starts_with(prefix)
            {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn encode(&self, data: &Record) -> Result<Vec<u8>> {
        self.codec.encode(data)
    }

    fn decode(&self, raw: &[u8]) -> Result<Record> {
        self.codec.decode(raw)
    }

    fn create_collection(&self, collection: &str) -> Result<Box<dyn ConfigStore>> {
        validate_collection_name(collection)?;
        Ok(Box::new(Self {
            root: self.root.clone(),
            collection: collection.to_string(),
            codec: self.codec,
        }))
    }

    fn all_collection_names(&self) -> Result<Vec<String>> {
        let mut collections = Vec::new();
        self.collect_collections(&self.root, "", &mut collections)?;
        collections.sort();
        Ok(collections)
    }

    fn collection_name(&self) -> &str {
        &self.collection
    }
}
