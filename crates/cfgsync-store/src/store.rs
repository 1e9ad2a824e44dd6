//! The collection-scoped store contract

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::Result;

/// A configuration record: string keys mapped to scalars, nested mappings,
/// or ordered sequences.
pub type Record = Map<String, Value>;

/// Name of the default collection.
pub const DEFAULT_COLLECTION: &str = "";

/// A store of named configuration records.
///
/// Every handle is scoped to one collection; [`ConfigStore::create_collection`]
/// returns a handle for another collection over the same backing storage.
/// Each call is atomic for a single name.
pub trait ConfigStore: Send + Sync {
    /// Whether a record with this name exists.
    fn exists(&self, name: &str) -> Result<bool>;

    /// Read a record, `None` when it does not exist.
    fn read(&self, name: &str) -> Result<Option<Record>>;

    /// Read several records. Missing names are simply absent from the result.
    fn read_multiple(&self, names: &[String]) -> Result<BTreeMap<String, Record>> {
        let mut found = BTreeMap::new();
        for name in names {
            if let Some(data) = self.read(name)? {
                found.insert(name.clone(), data);
            }
        }
        Ok(found)
    }

    /// Create or overwrite a record.
    ///
    /// The name and every key are validated before the store is touched.
    fn write(&self, name: &str, data: &Record) -> Result<()>;

    /// Delete a record, returning `false` if it did not exist.
    fn delete(&self, name: &str) -> Result<bool>;

    /// Rename a record.
    ///
    /// Returns `false` when `name` is absent or `new_name` is already taken.
    fn rename(&self, name: &str, new_name: &str) -> Result<bool>;

    /// Names starting with `prefix`, in lexicographic order.
    fn list_all(&self, prefix: &str) -> Result<Vec<String>>;

    /// Delete every record starting with `prefix`.
    ///
    /// Returns `true` when every matching record was removed.
    fn delete_all(&self, prefix: &str) -> Result<bool> {
        let mut all_deleted = true;
        for name in self.list_all(prefix)? {
            all_deleted &= self.delete(&name)?;
        }
        Ok(all_deleted)
    }

    /// Serialize a record the way this store persists it.
    fn encode(&self, data: &Record) -> Result<Vec<u8>>;

    /// Inverse of [`ConfigStore::encode`].
    fn decode(&self, raw: &[u8]) -> Result<Record>;

    /// A handle scoped to another collection of the same storage.
    fn create_collection(&self, collection: &str) -> Result<Box<dyn ConfigStore>>;

    /// Every non-empty named collection of the storage, sorted.
    ///
    /// The default collection is never included.
    fn all_collection_names(&self) -> Result<Vec<String>>;

    /// The collection this handle is scoped to.
    fn collection_name(&self) -> &str;
}
