//! Typed view over the extension manifest record.
//!
//! The manifest is the reserved record [`EXTENSION_MANIFEST`] listing the
//! active modules and themes with their weights:
//!
//! ```yaml
//! module:
//!   node: 0
//!   views: 10
//! theme:
//!   olivero: 0
//! ```
//!
//! Keys other than `module` and `theme` are carried through untouched.

use std::collections::BTreeMap;
use std::fmt;

use cfgsync_store::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Name of the record holding the extension manifest.
pub const EXTENSION_MANIFEST: &str = "core.extension";

/// The two kinds of extension listed in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionKind {
    Module,
    Theme,
}

impl ExtensionKind {
    pub const ALL: [ExtensionKind; 2] = [ExtensionKind::Module, ExtensionKind::Theme];

    /// Key of this kind's section in the manifest record.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Theme => "theme",
        }
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The manifest record, decoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    /// Active modules mapped to their weight.
    #[serde(default)]
    pub module: BTreeMap<String, i64>,
    /// Active themes mapped to their weight.
    #[serde(default)]
    pub theme: BTreeMap<String, i64>,
    /// Any other keys of the record.
    #[serde(flatten)]
    pub other: Record,
}

impl ExtensionManifest {
    /// Decode the manifest from its record.
    pub fn from_record(data: &Record) -> Result<Self> {
        serde_json::from_value(Value::Object(data.clone())).map_err(|e| Error::InvalidManifest {
            reason: e.to_string(),
        })
    }

    /// Encode the manifest back into a record.
    pub fn to_record(&self) -> Result<Record> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(Error::InvalidManifest {
                reason: format!("manifest encoded to a non-mapping value: {other}"),
            }),
            Err(e) => Err(Error::InvalidManifest {
                reason: e.to_string(),
            }),
        }
    }

    pub fn section(&self, kind: ExtensionKind) -> &BTreeMap<String, i64> {
        match kind {
            ExtensionKind::Module => &self.module,
            ExtensionKind::Theme => &self.theme,
        }
    }

    pub fn section_mut(&mut self, kind: ExtensionKind) -> &mut BTreeMap<String, i64> {
        match kind {
            ExtensionKind::Module => &mut self.module,
            ExtensionKind::Theme => &mut self.theme,
        }
    }

    /// Whether `name` is listed in the given section.
    pub fn contains(&self, kind: ExtensionKind, name: &str) -> bool {
        self.section(kind).contains_key(name)
    }

    /// Extensions of one kind ordered by weight, then name.
    pub fn ordered(&self, kind: ExtensionKind) -> Vec<(&str, i64)> {
        let mut entries: Vec<(&str, i64)> = self
            .section(kind)
            .iter()
            .map(|(name, weight)| (name.as_str(), *weight))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn decodes_sections_and_keeps_other_keys() {
        let data = record(json!({
            "module": {"node": 0, "views": 10, "standard": 1000},
            "theme": {"olivero": 0},
            "profile": "standard"
        }));

        let manifest = ExtensionManifest::from_record(&data).unwrap();

        assert_eq!(manifest.module.len(), 3);
        assert!(manifest.contains(ExtensionKind::Theme, "olivero"));
        assert_eq!(manifest.other.get("profile"), Some(&json!("standard")));
        assert_eq!(manifest.to_record().unwrap(), data);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let manifest = ExtensionManifest::from_record(&Record::new()).unwrap();
        assert!(manifest.module.is_empty());
        assert!(manifest.theme.is_empty());
    }

    #[test]
    fn non_numeric_weight_is_invalid() {
        let data = record(json!({"module": {"node": "heavy"}}));
        assert!(matches!(
            ExtensionManifest::from_record(&data),
            Err(Error::InvalidManifest { .. })
        ));
    }

    #[test]
    fn ordered_sorts_by_weight_then_name() {
        let data = record(json!({"module": {"b": 5, "a": 5, "c": -1, "z": 0}}));
        let manifest = ExtensionManifest::from_record(&data).unwrap();

        assert_eq!(
            manifest.ordered(ExtensionKind::Module),
            vec![("c", -1), ("z", 0), ("a", 5), ("b", 5)]
        );
    }
}
