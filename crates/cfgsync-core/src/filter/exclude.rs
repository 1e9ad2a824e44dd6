//! Hide records by name pattern.

use cfgsync_store::{ConfigStore, Record};

use super::StorageFilter;

/// Makes matching records invisible: they read as missing, are left out of
/// listings, and cannot be written, deleted or renamed through the filter.
///
/// A pattern matches a name exactly, or as a prefix when it ends in `*`
/// (`devel.*` matches `devel.settings`).
#[derive(Debug, Clone, Default)]
pub struct ExcludeFilter {
    patterns: Vec<String>,
}

impl ExcludeFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.patterns.iter().any(|pattern| match pattern.strip_suffix('*') {
            Some(prefix) => name.starts_with(prefix),
            None => name == pattern,
        })
    }
}

impl StorageFilter for ExcludeFilter {
    fn name(&self) -> &str {
        "exclude"
    }

    fn filter_read(&self, name: &str, data: Option<Record>) -> cfgsync_store::Result<Option<Record>> {
        if self.is_excluded(name) {
            return Ok(None);
        }
        Ok(data)
    }

    fn filter_write(
        &self,
        name: &str,
        data: Record,
        _base: &dyn ConfigStore,
    ) -> cfgsync_store::Result<Record> {
        if self.is_excluded(name) {
            return Err(cfgsync_store::Error::Filtered {
                filter: self.name().to_string(),
                name: name.to_string(),
                reason: "record is excluded from synchronization".to_string(),
            });
        }
        Ok(data)
    }

    fn filter_exists(&self, name: &str, exists: bool) -> bool {
        exists && !self.is_excluded(name)
    }

    fn filter_delete(&self, name: &str, delete: bool) -> bool {
        delete && !self.is_excluded(name)
    }

    fn filter_list_all(&self, _prefix: &str, names: Vec<String>) -> Vec<String> {
        names
            .into_iter()
            .filter(|name| !self.is_excluded(name))
            .collect()
    }

    fn filter_rename(&self, name: &str, new_name: &str, rename: bool) -> bool {
        rename && !self.is_excluded(name) && !self.is_excluded(new_name)
    }
}
