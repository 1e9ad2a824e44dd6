//! Diffing two stores into a changelist
//!
//! [`StorageComparer`] walks every collection of a source and a target
//! store and records what has to happen to the target for it to match the
//! source: records to create, update, delete and (optionally) rename.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use cfgsync_extensions::EXTENSION_MANIFEST;
use cfgsync_store::{ConfigStore, DEFAULT_COLLECTION, Record};
use serde_json::Value;

use crate::{Error, Result};

/// Operations needed in a single collection.
///
/// Every list is sorted by name, except that the extension manifest is
/// moved to the front of `create` and `update`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionChanges {
    pub create: Vec<String>,
    pub update: Vec<String>,
    pub delete: Vec<String>,
    /// `(old, new)` pairs.
    pub rename: Vec<(String, String)>,
}

impl CollectionChanges {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.update.is_empty()
            && self.delete.is_empty()
            && self.rename.is_empty()
    }

    /// Records to write from the source: the extension manifest if it
    /// changed, then creates, then updates.
    pub fn writes(&self) -> impl Iterator<Item = &String> {
        let all = || self.create.iter().chain(self.update.iter());
        all()
            .filter(|n| *n == EXTENSION_MANIFEST)
            .chain(all().filter(|n| *n != EXTENSION_MANIFEST))
    }

    /// Whether `name` appears in any list.
    pub fn contains(&self, name: &str) -> bool {
        self.create.iter().any(|n| n == name)
            || self.update.iter().any(|n| n == name)
            || self.delete.iter().any(|n| n == name)
            || self.rename.iter().any(|(old, new)| old == name || new == name)
    }

    fn normalize(&mut self) {
        self.create.sort();
        self.update.sort();
        self.delete.sort();
        self.rename.sort();
        manifest_first(&mut self.create);
        manifest_first(&mut self.update);
    }
}

fn manifest_first(names: &mut [String]) {
    if let Some(pos) = names.iter().position(|n| n == EXTENSION_MANIFEST) {
        names[..=pos].rotate_right(1);
    }
}

/// Counts of each operation across all collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub rename: usize,
}

impl ChangeSummary {
    pub fn total(&self) -> usize {
        self.create + self.update + self.delete + self.rename
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} to rename",
            self.create, self.update, self.delete, self.rename
        )
    }
}

/// Per-collection changes, default collection first then by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeList {
    collections: BTreeMap<String, CollectionChanges>,
}

impl ChangeList {
    /// Names of every compared collection.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Changes for one collection, if it was compared.
    pub fn changes(&self, collection: &str) -> Option<&CollectionChanges> {
        self.collections.get(collection)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CollectionChanges)> {
        self.collections.iter().map(|(name, changes)| (name.as_str(), changes))
    }

    pub fn has_changes(&self) -> bool {
        self.collections.values().any(|c| !c.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        !self.has_changes()
    }

    /// A copy with every delete dropped, for partial imports.
    pub fn without_deletes(&self) -> Self {
        let mut list = self.clone();
        for changes in list.collections.values_mut() {
            changes.delete.clear();
        }
        list
    }

    pub fn summary(&self) -> ChangeSummary {
        self.collections
            .values()
            .fold(ChangeSummary::default(), |mut acc, c| {
                acc.create += c.create.len();
                acc.update += c.update.len();
                acc.delete += c.delete.len();
                acc.rename += c.rename.len();
                acc
            })
    }

    /// Insert or replace the changes of one collection.
    pub fn insert(&mut self, collection: impl Into<String>, mut changes: CollectionChanges) {
        changes.normalize();
        self.collections.insert(collection.into(), changes);
    }
}

/// Computes the changelist that turns `target` into `source`.
pub struct StorageComparer<'a> {
    source: &'a dyn ConfigStore,
    target: &'a dyn ConfigStore,
    rename_key: Option<String>,
    changelist: ChangeList,
}

impl<'a> StorageComparer<'a> {
    pub fn new(source: &'a dyn ConfigStore, target: &'a dyn ConfigStore) -> Self {
        Self {
            source,
            target,
            rename_key: None,
            changelist: ChangeList::default(),
        }
    }

    /// Pair deleted and created records sharing this top-level key's value
    /// into renames.
    pub fn with_rename_key(mut self, key: impl Into<String>) -> Self {
        self.rename_key = Some(key.into());
        self
    }

    /// Diff both stores, replacing any previous result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Comparison`] when a collection cannot be listed or a
    /// record cannot be read. Neither store is modified.
    pub fn create_changelist(&mut self) -> Result<&ChangeList> {
        let mut list = ChangeList::default();
        for collection in self.collection_names()? {
            let changes = self
                .compare_collection(&collection)
                .map_err(|source| Error::Comparison {
                    collection: collection.clone(),
                    source,
                })?;
            tracing::debug!(collection = %collection, ?changes, "Compared collection");
            list.insert(collection, changes);
        }
        self.changelist = list;
        Ok(&self.changelist)
    }

    /// The last computed changelist; empty before [`Self::create_changelist`].
    pub fn changelist(&self) -> &ChangeList {
        &self.changelist
    }

    pub fn into_changelist(self) -> ChangeList {
        self.changelist
    }

    pub fn has_changes(&self) -> bool {
        self.changelist.has_changes()
    }

    pub fn source(&self) -> &'a dyn ConfigStore {
        self.source
    }

    pub fn target(&self) -> &'a dyn ConfigStore {
        self.target
    }

    pub fn rename_key(&self) -> Option<&str> {
        self.rename_key.as_deref()
    }

    fn collection_names(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::from([DEFAULT_COLLECTION.to_string()]);
        for store in [self.source, self.target] {
            let found = store
                .all_collection_names()
                .map_err(|source| Error::Comparison {
                    collection: DEFAULT_COLLECTION.to_string(),
                    source,
                })?;
            names.extend(found);
        }
        Ok(names)
    }

    fn compare_collection(&self, collection: &str) -> cfgsync_store::Result<CollectionChanges> {
        let source = self.source.create_collection(collection)?;
        let target = self.target.create_collection(collection)?;

        let source_names: BTreeSet<String> = source.list_all("")?.into_iter().collect();
        let target_names: BTreeSet<String> = target.list_all("")?.into_iter().collect();

        let mut changes = CollectionChanges {
            create: source_names.difference(&target_names).cloned().collect(),
            delete: target_names.difference(&source_names).cloned().collect(),
            ..Default::default()
        };

        for name in source_names.intersection(&target_names) {
            let left = source.read(name)?;
            let right = target.read(name)?;
            if left != right {
                changes.update.push(name.clone());
            }
        }

        if let Some(key) = &self.rename_key {
            detect_renames(&mut changes, key, source.as_ref(), target.as_ref())?;
        }

        Ok(changes)
    }
}

/// Scalar value of `key` in a record, used to pair renames.
fn identity(data: &Record, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn detect_renames(
    changes: &mut CollectionChanges,
    key: &str,
    source: &dyn ConfigStore,
    target: &dyn ConfigStore,
) -> cfgsync_store::Result<()> {
    if changes.create.is_empty() || changes.delete.is_empty() {
        return Ok(());
    }

    let mut deleted: BTreeMap<String, String> = BTreeMap::new();
    for name in &changes.delete {
        if let Some(data) = target.read(name)?
            && let Some(id) = identity(&data, key)
        {
            deleted.entry(id).or_insert_with(|| name.clone());
        }
    }

    let mut renames = Vec::new();
    for name in &changes.create {
        if let Some(data) = source.read(name)?
            && let Some(id) = identity(&data, key)
            && let Some(old) = deleted.remove(&id)
        {
            tracing::debug!(from = %old, to = %name, key, "Detected rename");
            renames.push((old, name.clone()));
        }
    }

    for (old, new) in &renames {
        changes.delete.retain(|n| n != old);
        changes.create.retain(|n| n != new);
    }
    changes.rename = renames;
    Ok(())
}

/// Diff `source` against `target` without rename detection.
pub fn compare(source: &dyn ConfigStore, target: &dyn ConfigStore) -> Result<ChangeList> {
    let mut comparer = StorageComparer::new(source, target);
    comparer.create_changelist()?;
    Ok(comparer.into_changelist())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn manifest_moves_to_front() {
        let mut changes = CollectionChanges {
            create: names(&["views.view.content", "block.block.a", EXTENSION_MANIFEST]),
            update: names(&["system.site"]),
            ..Default::default()
        };
        changes.normalize();

        assert_eq!(
            changes.create,
            names(&[EXTENSION_MANIFEST, "block.block.a", "views.view.content"])
        );
        assert_eq!(changes.update, names(&["system.site"]));
    }

    #[test]
    fn summary_counts_all_collections() {
        let mut list = ChangeList::default();
        list.insert(
            "",
            CollectionChanges {
                create: names(&["a.a"]),
                delete: names(&["c.c"]),
                ..Default::default()
            },
        );
        list.insert(
            "language.fr",
            CollectionChanges {
                update: names(&["b.b"]),
                rename: vec![("x.old".into(), "x.new".into())],
                ..Default::default()
            },
        );

        let summary = list.summary();
        assert_eq!(summary.total(), 4);
        assert_eq!(
            summary.to_string(),
            "1 to create, 1 to update, 1 to delete, 1 to rename"
        );
        assert_eq!(list.collections().collect::<Vec<_>>(), vec!["", "language.fr"]);
    }

    #[test]
    fn without_deletes_keeps_everything_else() {
        let mut list = ChangeList::default();
        list.insert(
            "",
            CollectionChanges {
                create: names(&["a.a"]),
                delete: names(&["c.c"]),
                ..Default::default()
            },
        );

        let partial = list.without_deletes();
        let changes = partial.changes("").unwrap();
        assert!(changes.delete.is_empty());
        assert_eq!(changes.create, names(&["a.a"]));
        assert!(partial.has_changes());
    }

    #[test]
    fn identity_only_uses_scalars() {
        let data: Record = serde_json::json!({"uuid": "abc", "n": 5, "obj": {"x": 1}})
            .as_object()
            .cloned()
            .unwrap();

        assert_eq!(identity(&data, "uuid").as_deref(), Some("abc"));
        assert_eq!(identity(&data, "n").as_deref(), Some("5"));
        assert_eq!(identity(&data, "obj"), None);
        assert_eq!(identity(&data, "missing"), None);
    }
}
