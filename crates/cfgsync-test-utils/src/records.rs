//! Record builders and store seeding.

use cfgsync_store::{ConfigStore, MemoryStore, Record};
use serde_json::{Value, json};

/// Turn a `json!` object into a [`Record`].
///
/// # Panics
/// Panics if `value` is not an object.
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("record: expected a JSON object, got {other}"),
    }
}

/// An extension manifest record listing `modules` and `themes` with weights.
pub fn manifest(modules: &[(&str, i64)], themes: &[(&str, i64)]) -> Record {
    let section = |entries: &[(&str, i64)]| {
        entries
            .iter()
            .map(|(name, weight)| (name.to_string(), json!(weight)))
            .collect::<serde_json::Map<_, _>>()
    };
    record(json!({
        "module": section(modules),
        "theme": section(themes),
    }))
}

/// Write every `(name, record)` pair into `store`.
///
/// # Panics
/// Panics on the first failed write.
pub fn seed(store: &dyn ConfigStore, records: &[(&str, Value)]) {
    for (name, value) in records {
        store
            .write(name, &record(value.clone()))
            .unwrap_or_else(|e| panic!("seed: failed to write {name}: {e}"));
    }
}

/// A fresh [`MemoryStore`] holding `records` in the default collection.
pub fn seeded_memory_store(records: &[(&str, Value)]) -> MemoryStore {
    let store = MemoryStore::new();
    seed(&store, records);
    store
}
