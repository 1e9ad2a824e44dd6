//! Filters for observing chain behaviour.

use cfgsync_core::StorageFilter;
use cfgsync_store::{ConfigStore, Record};
use serde_json::Value;

/// Appends its tag to a `trail` list on every read and write.
///
/// Chaining several tag filters shows the order the chain ran them in.
#[derive(Debug, Clone)]
pub struct TagFilter {
    tag: String,
}

impl TagFilter {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    fn tag(&self, mut data: Record) -> Record {
        let trail = data
            .entry("trail")
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = trail {
            items.push(Value::String(self.tag.clone()));
        }
        data
    }
}

impl StorageFilter for TagFilter {
    fn name(&self) -> &str {
        &self.tag
    }

    fn filter_read(&self, _name: &str, data: Option<Record>) -> cfgsync_store::Result<Option<Record>> {
        Ok(data.map(|d| self.tag(d)))
    }

    fn filter_write(
        &self,
        _name: &str,
        data: Record,
        _base: &dyn ConfigStore,
    ) -> cfgsync_store::Result<Record> {
        Ok(self.tag(data))
    }
}
