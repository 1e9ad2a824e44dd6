//! Storage filters
//!
//! A [`StorageFilter`] intercepts every read and write path of a store and
//! may rewrite records on the way through. Filters are composed into a
//! [`FilterChain`] and applied by a [`FilteredStore`]:
//!
//! - writes, deletes and renames run the chain in list order
//! - reads, existence checks and listings run it in reverse
//!
//! so for a chain `[A, B]` a write is seen by `A` then `B` and a read by
//! `B` then `A`. Filters never need to know about each other.

mod core_extension;
mod exclude;

pub use core_extension::{Adjustment, CoreExtensionFilter};
pub use exclude::ExcludeFilter;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use cfgsync_store::{ConfigStore, Record};

/// A transformation applied to records passing through a store.
///
/// Every hook defaults to the identity, so a filter only implements the
/// paths it cares about.
pub trait StorageFilter: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Rewrite a record after it was read. `None` means "does not exist".
    fn filter_read(&self, _name: &str, data: Option<Record>) -> cfgsync_store::Result<Option<Record>> {
        Ok(data)
    }

    /// Rewrite a record before it is written.
    ///
    /// `base` is the unfiltered store the record is about to land in.
    fn filter_write(
        &self,
        _name: &str,
        data: Record,
        _base: &dyn ConfigStore,
    ) -> cfgsync_store::Result<Record> {
        Ok(data)
    }

    fn filter_exists(&self, _name: &str, exists: bool) -> bool {
        exists
    }

    /// Return `false` to veto a delete.
    fn filter_delete(&self, _name: &str, delete: bool) -> bool {
        delete
    }

    fn filter_list_all(&self, _prefix: &str, names: Vec<String>) -> Vec<String> {
        names
    }

    /// Return `false` to veto a rename.
    fn filter_rename(&self, _name: &str, _new_name: &str, rename: bool) -> bool {
        rename
    }
}

/// Ordered set of filters, assembled once.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn StorageFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter; it runs after every filter already added on write.
    pub fn with(mut self, filter: impl StorageFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Filter names in write order.
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    fn write_order(&self) -> impl Iterator<Item = &Arc<dyn StorageFilter>> {
        self.filters.iter()
    }

    fn read_order(&self) -> impl Iterator<Item = &Arc<dyn StorageFilter>> {
        self.filters.iter().rev()
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// A store whose every operation passes through a [`FilterChain`].
pub struct FilteredStore {
    base: Box<dyn ConfigStore>,
    chain: FilterChain,
}

impl FilteredStore {
    pub fn new(base: Box<dyn ConfigStore>, chain: FilterChain) -> Self {
        Self { base, chain }
    }

    /// The unfiltered store underneath.
    pub fn base(&self) -> &dyn ConfigStore {
        self.base.as_ref()
    }

    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }
}

impl ConfigStore for FilteredStore {
    fn exists(&self, name: &str) -> cfgsync_store::Result<bool> {
        let exists = self.base.exists(name)?;
        Ok(self
            .chain
            .read_order()
            .fold(exists, |acc, filter| filter.filter_exists(name, acc)))
    }

    fn read(&self, name: &str) -> cfgsync_store::Result<Option<Record>> {
        let mut data = self.base.read(name)?;
        for filter in self.chain.read_order() {
            data = filter.filter_read(name, data)?;
        }
        Ok(data)
    }

    fn read_multiple(&self, names: &[String]) -> cfgsync_store::Result<BTreeMap<String, Record>> {
        let mut found = BTreeMap::new();
        for name in names {
            if let Some(data) = self.read(name)? {
                found.insert(name.clone(), data);
            }
        }
        Ok(found)
    }

    fn write(&self, name: &str, data: &Record) -> cfgsync_store::Result<()> {
        let mut filtered = data.clone();
        for filter in self.chain.write_order() {
            filtered = filter.filter_write(name, filtered, self.base.as_ref())?;
        }
        self.base.write(name, &filtered)
    }

    fn delete(&self, name: &str) -> cfgsync_store::Result<bool> {
        let allowed = self
            .chain
            .write_order()
            .fold(true, |acc, filter| filter.filter_delete(name, acc));
        if !allowed {
            tracing::debug!(name, "Delete vetoed by filter");
            return Ok(false);
        }
        self.base.delete(name)
    }

    fn rename(&self, name: &str, new_name: &str) -> cfgsync_store::Result<bool> {
        let allowed = self
            .chain
            .write_order()
            .fold(true, |acc, filter| filter.filter_rename(name, new_name, acc));
        if !allowed {
            tracing::debug!(name, new_name, "Rename vetoed by filter");
            return Ok(false);
        }
        self.base.rename(name, new_name)
    }

    fn list_all(&self, prefix: &str) -> cfgsync_store::Result<Vec<String>> {
        let names = self.base.list_all(prefix)?;
        let mut names = self
            .chain
            .read_order()
            .fold(names, |acc, filter| filter.filter_list_all(prefix, acc));
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn delete_all(&self, prefix: &str) -> cfgsync_store::Result<bool> {
        let mut all_deleted = true;
        for name in self.list_all(prefix)? {
            all_deleted &= self.delete(&name)?;
        }
        Ok(all_deleted)
    }

    fn encode(&self, data: &Record) -> cfgsync_store::Result<Vec<u8>> {
        self.base.encode(data)
    }

    fn decode(&self, raw: &[u8]) -> cfgsync_store::Result<Record> {
        self.base.decode(raw)
    }

    fn create_collection(&self, collection: &str) -> cfgsync_store::Result<Box<dyn ConfigStore>> {
        let base = self.base.create_collection(collection)?;
        Ok(Box::new(FilteredStore::new(base, self.chain.clone())))
    }

    fn all_collection_names(&self) -> cfgsync_store::Result<Vec<String>> {
        self.base.all_collection_names()
    }

    fn collection_name(&self) -> &str {
        self.base.collection_name()
    }
}
