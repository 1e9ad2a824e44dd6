//! The side-effect contract the importer calls into.

use crate::error::Result;
use crate::manifest::ExtensionKind;

/// Installs and uninstalls extensions on behalf of an import.
///
/// Either the whole batch succeeds or an error is returned; an error is
/// fatal for the changelist being applied.
pub trait ExtensionHandler {
    fn install(&self, kind: ExtensionKind, names: &[String]) -> Result<()>;

    fn uninstall(&self, kind: ExtensionKind, names: &[String]) -> Result<()>;
}

impl<T: ExtensionHandler + ?Sized> ExtensionHandler for &T {
    fn install(&self, kind: ExtensionKind, names: &[String]) -> Result<()> {
        (**self).install(kind, names)
    }

    fn uninstall(&self, kind: ExtensionKind, names: &[String]) -> Result<()> {
        (**self).uninstall(kind, names)
    }
}
