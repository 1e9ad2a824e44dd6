//! Checks run under the lock before anything is applied.

use cfgsync_extensions::{EXTENSION_MANIFEST, ExtensionChanges, ExtensionManifest};
use cfgsync_store::{ConfigStore, DEFAULT_COLLECTION};

use crate::comparer::ChangeList;

/// Everything wrong with an import, plus the extension changes it implies
/// when those could be worked out.
pub(super) struct Validation {
    pub errors: Vec<String>,
    pub extensions: ExtensionChanges,
}

pub(super) fn validate(
    changelist: &ChangeList,
    source: &dyn ConfigStore,
    target: &dyn ConfigStore,
    partial: bool,
) -> Validation {
    let mut errors = Vec::new();

    check_not_empty(changelist, source, &mut errors);
    if !partial {
        check_manifest_present(source, target, &mut errors);
    }
    check_renames(changelist, source, target, &mut errors);
    let extensions = extension_changes(changelist, source, target, &mut errors);

    Validation { errors, extensions }
}

/// An empty source that would wipe the target is almost certainly a mistake.
fn check_not_empty(changelist: &ChangeList, source: &dyn ConfigStore, errors: &mut Vec<String>) {
    let deletes = changelist.summary().delete;
    if deletes == 0 {
        return;
    }
    match source.list_all("") {
        Ok(names) if names.is_empty() => errors.push(format!(
            "The import source is empty and applying it would delete {deletes} record(s)"
        )),
        Ok(_) => {}
        Err(e) => errors.push(format!("Failed to list the import source: {e}")),
    }
}

fn check_manifest_present(source: &dyn ConfigStore, target: &dyn ConfigStore, errors: &mut Vec<String>) {
    let in_target = target.exists(EXTENSION_MANIFEST);
    let in_source = source.exists(EXTENSION_MANIFEST);
    match (in_target, in_source) {
        (Ok(true), Ok(false)) => errors.push(format!(
            "The extension manifest {EXTENSION_MANIFEST} is missing from the import source"
        )),
        (Err(e), _) | (_, Err(e)) => {
            errors.push(format!("Failed to look up {EXTENSION_MANIFEST}: {e}"))
        }
        _ => {}
    }
}

fn check_renames(
    changelist: &ChangeList,
    source: &dyn ConfigStore,
    target: &dyn ConfigStore,
    errors: &mut Vec<String>,
) {
    for (collection, changes) in changelist.iter() {
        if changes.rename.is_empty() {
            continue;
        }
        for (old, new) in &changes.rename {
            let listed = |name: &String| changes.create.contains(name) || changes.delete.contains(name);
            if listed(old) || listed(new) {
                errors.push(format!(
                    "Rename of {old} to {new} conflicts with another change{}",
                    in_collection(collection)
                ));
            }
        }

        let (source_c, target_c) = match (
            source.create_collection(collection),
            target.create_collection(collection),
        ) {
            (Ok(s), Ok(t)) => (s, t),
            (Err(e), _) | (_, Err(e)) => {
                errors.push(format!("Failed to open collection '{collection}': {e}"));
                continue;
            }
        };
        for (old, new) in &changes.rename {
            match target_c.exists(new) {
                Ok(true) => errors.push(format!(
                    "Cannot rename {old} to {new}: {new} already exists{}",
                    in_collection(collection)
                )),
                Ok(false) => {}
                Err(e) => errors.push(format!("Failed to look up {new}: {e}")),
            }
            if let Ok(false) = source_c.exists(new) {
                errors.push(format!(
                    "Cannot rename {old} to {new}: {new} is missing from the import source"
                ));
            }
        }
    }
}

fn extension_changes(
    changelist: &ChangeList,
    source: &dyn ConfigStore,
    target: &dyn ConfigStore,
    errors: &mut Vec<String>,
) -> ExtensionChanges {
    let manifest_changed = changelist
        .changes(DEFAULT_COLLECTION)
        .is_some_and(|c| c.writes().any(|n| n == EXTENSION_MANIFEST));
    if !manifest_changed {
        return ExtensionChanges::default();
    }

    let mut load = |store: &dyn ConfigStore, side: &str| -> Option<ExtensionManifest> {
        match store.read(EXTENSION_MANIFEST) {
            Ok(Some(data)) => match ExtensionManifest::from_record(&data) {
                Ok(manifest) => Some(manifest),
                Err(e) => {
                    errors.push(format!("Invalid {side} {EXTENSION_MANIFEST}: {e}"));
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                errors.push(format!("Failed to read {side} {EXTENSION_MANIFEST}: {e}"));
                None
            }
        }
    };
    let current = load(target, "active");
    let desired = load(source, "source");

    ExtensionChanges::between(current.as_ref(), desired.as_ref())
}

pub(super) fn in_collection(collection: &str) -> String {
    if collection.is_empty() {
        String::new()
    } else {
        format!(" in collection {collection}")
    }
}
