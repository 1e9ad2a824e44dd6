//! Install/uninstall sets implied by two manifests.

use crate::manifest::{ExtensionKind, ExtensionManifest};

/// Extensions to install and uninstall to move from one manifest to another.
///
/// Installs are listed modules first, then themes, each in ascending weight
/// order. Uninstalls are listed themes first, then modules, each in
/// descending weight order, so that an extension is removed before whatever
/// it was installed after.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionChanges {
    install: Vec<(ExtensionKind, Vec<String>)>,
    uninstall: Vec<(ExtensionKind, Vec<String>)>,
}

impl ExtensionChanges {
    /// Compare the manifest currently in effect with the desired one.
    ///
    /// A missing desired manifest means "no opinion" and yields no changes.
    /// A missing current manifest means nothing is installed yet.
    pub fn between(current: Option<&ExtensionManifest>, desired: Option<&ExtensionManifest>) -> Self {
        let Some(desired) = desired else {
            return Self::default();
        };
        let empty = ExtensionManifest::default();
        let current = current.unwrap_or(&empty);

        let mut install = Vec::new();
        for kind in ExtensionKind::ALL {
            let names: Vec<String> = desired
                .ordered(kind)
                .into_iter()
                .filter(|(name, _)| !current.contains(kind, name))
                .map(|(name, _)| name.to_string())
                .collect();
            if !names.is_empty() {
                install.push((kind, names));
            }
        }

        let mut uninstall = Vec::new();
        for kind in ExtensionKind::ALL.into_iter().rev() {
            let names: Vec<String> = current
                .ordered(kind)
                .into_iter()
                .rev()
                .filter(|(name, _)| !desired.contains(kind, name))
                .map(|(name, _)| name.to_string())
                .collect();
            if !names.is_empty() {
                uninstall.push((kind, names));
            }
        }

        Self { install, uninstall }
    }

    /// Batches to install, in execution order.
    pub fn install(&self) -> &[(ExtensionKind, Vec<String>)] {
        &self.install
    }

    /// Batches to uninstall, in execution order.
    pub fn uninstall(&self) -> &[(ExtensionKind, Vec<String>)] {
        &self.uninstall
    }

    pub fn is_empty(&self) -> bool {
        self.install.is_empty() && self.uninstall.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgsync_store::Record;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn manifest(value: serde_json::Value) -> ExtensionManifest {
        let data: Record = value.as_object().cloned().unwrap();
        ExtensionManifest::from_record(&data).unwrap()
    }

    #[test]
    fn computes_installs_and_uninstalls_in_order() {
        let current = manifest(json!({
            "module": {"node": 0, "devel": 5, "kint": 6},
            "theme": {"bartik": 0}
        }));
        let desired = manifest(json!({
            "module": {"node": 0, "views": 10, "block": -5},
            "theme": {"olivero": 0}
        }));

        let changes = ExtensionChanges::between(Some(&current), Some(&desired));

        assert_eq!(
            changes.install(),
            &[
                (ExtensionKind::Module, vec!["block".to_string(), "views".to_string()]),
                (ExtensionKind::Theme, vec!["olivero".to_string()]),
            ]
        );
        assert_eq!(
            changes.uninstall(),
            &[
                (ExtensionKind::Theme, vec!["bartik".to_string()]),
                (ExtensionKind::Module, vec!["kint".to_string(), "devel".to_string()]),
            ]
        );
    }

    #[test]
    fn identical_manifests_need_nothing() {
        let m = manifest(json!({"module": {"node": 0}}));
        assert!(ExtensionChanges::between(Some(&m), Some(&m)).is_empty());
    }

    #[test]
    fn missing_desired_manifest_changes_nothing() {
        let current = manifest(json!({"module": {"node": 0}}));
        assert!(ExtensionChanges::between(Some(&current), None).is_empty());
    }

    #[test]
    fn missing_current_manifest_installs_everything() {
        let desired = manifest(json!({"module": {"node": 0, "user": 0}}));
        let changes = ExtensionChanges::between(None, Some(&desired));

        assert_eq!(
            changes.install(),
            &[(ExtensionKind::Module, vec!["node".to_string(), "user".to_string()])]
        );
        assert!(changes.uninstall().is_empty());
    }
}
