//! In-memory store
//!
//! Collection handles created from one `MemoryStore` share the same data, so
//! a store can be seeded through one handle and inspected through another.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::store::{ConfigStore, DEFAULT_COLLECTION, Record};
use crate::validation::{
    validate_collection_name, validate_lookup_name, validate_name, validate_record,
};
use crate::{Codec, Result};

type Collections = BTreeMap<String, BTreeMap<String, Record>>;

/// A store holding records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<Collections>>,
    collection: String,
}

impl MemoryStore {
    /// Create an empty store scoped to the default collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle on another collection of the same data.
    pub fn collection(&self, collection: &str) -> Result<Self> {
        validate_collection_name(collection)?;
        Ok(Self {
            data: Arc::clone(&self.data),
            collection: collection.to_string(),
        })
    }

    fn with_read<T>(&self, f: impl FnOnce(Option<&BTreeMap<String, Record>>) -> T) -> T {
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        f(guard.get(&self.collection))
    }

    fn with_write<T>(&self, f: impl FnOnce(&mut Collections) -> T) -> T {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

/// Drop a named collection once it holds no records.
fn prune(collections: &mut Collections, collection: &str) {
    if collection != DEFAULT_COLLECTION
        && collections.get(collection).is_some_and(BTreeMap::is_empty)
    {
        collections.remove(collection);
    }
}

impl ConfigStore for MemoryStore {
    fn exists(&self, name: &str) -> Result<bool> {
        validate_lookup_name(name)?;
        Ok(self.with_read(|records| records.is_some_and(|r| r.contains_key(name))))
    }

    fn read(&self, name: &str) -> Result<Option<Record>> {
        validate_lookup_name(name)?;
        Ok(self.with_read(|records| records.and_then(|r| r.get(name).cloned())))
    }

    fn write(&self, name: &str, data: &Record) -> Result<()> {
        validate_name(name)?;
        validate_record(name, data)?;
        self.with_write(|collections| {
            collections
                .entry(self.collection.clone())
                .or_default()
                .insert(name.to_string(), data.clone());
        });
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        validate_lookup_name(name)?;
        Ok(self.with_write(|collections| {
            let removed = collections
                .get_mut(&self.collection)
                .and_then(|records| records.remove(name))
                .is_some();
            prune(collections, &self.collection);
            removed
        }))
    }

    fn rename(&self, name: &str, new_name: &str) -> Result<bool> {
        validate_lookup_name(name)?;
        validate_name(new_name)?;
        Ok(self.with_write(|collections| {
            let Some(records) = collections.get_mut(&self.collection) else {
                return false;
            };
            if records.contains_key(new_name) {
                return false;
            }
            match records.remove(name) {
                Some(data) => {
                    records.insert(new_name.to_string(), data);
                    true
                }
                None => false,
            }
        }))
    }

    fn list_all(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self.with_read(|records| {
            records
                .map(|r| {
                    r.keys()
                        .filter(|name| name.starts_with(prefix))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        }))
    }

    fn encode(&self, data: &Record) -> Result<Vec<u8>> {
        Codec::Json.encode(data)
    }

    fn decode(&self, raw: &[u8]) -> Result<Record> {
        Codec::Json.decode(raw)
    }

    fn create_collection(&self, collection: &str) -> Result<Box<dyn ConfigStore>> {
        Ok(Box::new(self.collection(collection)?))
    }

    fn all_collection_names(&self) -> Result<Vec<String>> {
        let guard = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard
            .iter()
            .filter(|(name, records)| !name.is_empty() && !records.is_empty())
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn collection_name(&self) -> &str {
        &self.collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn collection_handles_share_data() {
        let store = MemoryStore::new();
        let fr = store.collection("language.fr").unwrap();
        fr.write("system.site", &record(json!({"name": "Site"}))).unwrap();

        let again = store.collection("language.fr").unwrap();
        assert!(again.exists("system.site").unwrap());
        assert!(!store.exists("system.site").unwrap());
        assert_eq!(store.all_collection_names().unwrap(), vec!["language.fr"]);
    }

    #[test]
    fn empty_collections_disappear() {
        let store = MemoryStore::new();
        let fr = store.collection("language.fr").unwrap();
        fr.write("system.site", &Record::new()).unwrap();
        fr.delete("system.site").unwrap();

        assert!(store.all_collection_names().unwrap().is_empty());
    }

    #[test]
    fn rename_refuses_to_overwrite() {
        let store = MemoryStore::new();
        store.write("a.one", &Record::new()).unwrap();
        store.write("a.two", &Record::new()).unwrap();

        assert!(!store.rename("a.one", "a.two").unwrap());
        assert!(!store.rename("a.missing", "a.three").unwrap());
        assert!(store.rename("a.one", "a.three").unwrap());
        assert_eq!(store.list_all("").unwrap(), vec!["a.three", "a.two"]);
    }
}
