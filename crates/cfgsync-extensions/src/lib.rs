//! Extension manifest handling for cfgsync.
//!
//! The extension manifest is the one record whose changes have side effects
//! beyond the store: extensions that appear in it must be installed, those
//! that disappear must be uninstalled. This crate decodes the manifest,
//! computes those changes and defines the callback the importer uses to
//! carry them out.

pub mod changes;
pub mod error;
pub mod handler;
pub mod installer;
pub mod manifest;

pub use changes::ExtensionChanges;
pub use error::{Error, Result};
pub use handler::ExtensionHandler;
pub use installer::CommandHandler;
pub use manifest::{EXTENSION_MANIFEST, ExtensionKind, ExtensionManifest};
