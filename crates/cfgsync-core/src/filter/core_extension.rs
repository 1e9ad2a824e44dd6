//! Forced enable/disable of extensions in the manifest record.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use cfgsync_extensions::{EXTENSION_MANIFEST, ExtensionKind, ExtensionManifest};
use cfgsync_store::{ConfigStore, Record};

use super::StorageFilter;
use crate::{Error, Result};

/// What to force for one extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Force the extension into the manifest at this weight.
    Enable(i64),
    /// Force the extension out of the manifest.
    Disable,
}

impl Adjustment {
    /// Parse a `name=value` pair such as `devel=0` or `devel=disabled`.
    pub fn parse_pair(spec: &str) -> Result<(String, Adjustment)> {
        let Some((name, value)) = spec.split_once('=') else {
            return Err(Error::InvalidAdjustment {
                spec: spec.to_string(),
                reason: "expected name=weight or name=disabled".to_string(),
            });
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidAdjustment {
                spec: spec.to_string(),
                reason: "extension name is empty".to_string(),
            });
        }
        let adjustment = value.parse().map_err(|reason| Error::InvalidAdjustment {
            spec: spec.to_string(),
            reason,
        })?;
        Ok((name.to_string(), adjustment))
    }
}

impl FromStr for Adjustment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disabled" | "off" => Ok(Self::Disable),
            other => other
                .parse::<i64>()
                .map(Self::Enable)
                .map_err(|_| format!("'{other}' is neither a weight nor 'disabled'")),
        }
    }
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enable(weight) => write!(f, "{weight}"),
            Self::Disable => f.write_str("disabled"),
        }
    }
}

/// Keeps selected modules and themes enabled or disabled regardless of what
/// the underlying store says.
///
/// On read the adjustments are forced into the manifest. On write the
/// adjusted entries are restored from what the store already holds, so the
/// forced state never leaks into the store.
#[derive(Debug, Clone, Default)]
pub struct CoreExtensionFilter {
    module: BTreeMap<String, Adjustment>,
    theme: BTreeMap<String, Adjustment>,
}

impl CoreExtensionFilter {
    pub fn new(module: BTreeMap<String, Adjustment>) -> Self {
        Self {
            module,
            theme: BTreeMap::new(),
        }
    }

    pub fn with_theme_adjustments(mut self, theme: BTreeMap<String, Adjustment>) -> Self {
        self.theme = theme;
        self
    }

    pub fn adjust(mut self, kind: ExtensionKind, name: impl Into<String>, adjustment: Adjustment) -> Self {
        self.adjustments_mut(kind).insert(name.into(), adjustment);
        self
    }

    /// Build from `name=value` module specs.
    pub fn from_specs<S: AsRef<str>>(specs: &[S]) -> Result<Self> {
        let mut module = BTreeMap::new();
        for spec in specs {
            let (name, adjustment) = Adjustment::parse_pair(spec.as_ref())?;
            module.insert(name, adjustment);
        }
        Ok(Self::new(module))
    }

    pub fn is_empty(&self) -> bool {
        self.module.is_empty() && self.theme.is_empty()
    }

    pub fn adjustments(&self, kind: ExtensionKind) -> &BTreeMap<String, Adjustment> {
        match kind {
            ExtensionKind::Module => &self.module,
            ExtensionKind::Theme => &self.theme,
        }
    }

    fn adjustments_mut(&mut self, kind: ExtensionKind) -> &mut BTreeMap<String, Adjustment> {
        match kind {
            ExtensionKind::Module => &mut self.module,
            ExtensionKind::Theme => &mut self.theme,
        }
    }

    fn decode(&self, name: &str, data: &Record) -> cfgsync_store::Result<ExtensionManifest> {
        ExtensionManifest::from_record(data).map_err(|e| self.rejected(name, e))
    }

    fn encode(&self, name: &str, manifest: &ExtensionManifest) -> cfgsync_store::Result<Record> {
        manifest.to_record().map_err(|e| self.rejected(name, e))
    }

    fn rejected(&self, name: &str, error: cfgsync_extensions::Error) -> cfgsync_store::Error {
        cfgsync_store::Error::Filtered {
            filter: self.name().to_string(),
            name: name.to_string(),
            reason: error.to_string(),
        }
    }
}

impl StorageFilter for CoreExtensionFilter {
    fn name(&self) -> &str {
        "core_extension"
    }

    fn filter_read(&self, name: &str, data: Option<Record>) -> cfgsync_store::Result<Option<Record>> {
        let Some(data) = data else {
            return Ok(None);
        };
        if name != EXTENSION_MANIFEST || self.is_empty() {
            return Ok(Some(data));
        }

        let mut manifest = self.decode(name, &data)?;
        for kind in ExtensionKind::ALL {
            for (extension, adjustment) in self.adjustments(kind) {
                let section = manifest.section_mut(kind);
                match adjustment {
                    Adjustment::Enable(weight) => {
                        section.insert(extension.clone(), *weight);
                    }
                    Adjustment::Disable => {
                        section.remove(extension);
                    }
                }
            }
        }
        self.encode(name, &manifest).map(Some)
    }

    fn filter_write(
        &self,
        name: &str,
        data: Record,
        base: &dyn ConfigStore,
    ) -> cfgsync_store::Result<Record> {
        if name != EXTENSION_MANIFEST || self.is_empty() {
            return Ok(data);
        }

        let existing = match base.read(name)? {
            Some(record) => self.decode(name, &record)?,
            None => ExtensionManifest::default(),
        };
        let mut manifest = self.decode(name, &data)?;

        for kind in ExtensionKind::ALL {
            for extension in self.adjustments(kind).keys() {
                match existing.section(kind).get(extension) {
                    Some(weight) => {
                        manifest.section_mut(kind).insert(extension.clone(), *weight);
                    }
                    None => {
                        manifest.section_mut(kind).remove(extension);
                    }
                }
            }
        }
        tracing::debug!(filter = self.name(), "Restored adjusted extensions before write");
        self.encode(name, &manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_weights_and_disabled() {
        assert_eq!("10".parse::<Adjustment>(), Ok(Adjustment::Enable(10)));
        assert_eq!("-5".parse::<Adjustment>(), Ok(Adjustment::Enable(-5)));
        assert_eq!("disabled".parse::<Adjustment>(), Ok(Adjustment::Disable));
        assert_eq!("OFF".parse::<Adjustment>(), Ok(Adjustment::Disable));
        assert!("heavy".parse::<Adjustment>().is_err());
    }

    #[test]
    fn parses_name_value_pairs() {
        let (name, adjustment) = Adjustment::parse_pair("devel=0").unwrap();
        assert_eq!(name, "devel");
        assert_eq!(adjustment, Adjustment::Enable(0));

        assert!(matches!(
            Adjustment::parse_pair("devel"),
            Err(Error::InvalidAdjustment { .. })
        ));
        assert!(matches!(
            Adjustment::parse_pair("=5"),
            Err(Error::InvalidAdjustment { .. })
        ));
    }

    #[test]
    fn from_specs_collects_module_adjustments() {
        let filter = CoreExtensionFilter::from_specs(&["devel=0", "big_pipe=off"]).unwrap();
        let modules = filter.adjustments(ExtensionKind::Module);

        assert_eq!(modules.get("devel"), Some(&Adjustment::Enable(0)));
        assert_eq!(modules.get("big_pipe"), Some(&Adjustment::Disable));
        assert!(filter.adjustments(ExtensionKind::Theme).is_empty());
    }

    #[test]
    fn adjustment_display_round_trips() {
        for adjustment in [Adjustment::Enable(3), Adjustment::Disable] {
            assert_eq!(adjustment.to_string().parse::<Adjustment>(), Ok(adjustment));
        }
    }
}
