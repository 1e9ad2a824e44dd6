//! Error types for cfgsync-core

use std::path::PathBuf;

/// Result type for cfgsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while comparing or importing configuration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A record could not be read or decoded while diffing
    #[error("Comparison failed in collection '{}': {source}", display_collection(.collection))]
    Comparison {
        collection: String,
        #[source]
        source: cfgsync_store::Error,
    },

    /// Another import holds the lock
    #[error("Another import is in progress (lock '{name}' is held)")]
    LockContention { name: String },

    /// The lock backend itself failed
    #[error("Lock '{name}' failed: {message}")]
    Lock { name: String, message: String },

    /// Validation or apply errors collected during one import run
    #[error("Import failed: {}", .errors.join("; "))]
    ImportFailed { errors: Vec<String> },

    /// A settings file could not be parsed
    #[error("Invalid settings in {path}: {message}")]
    Settings { path: PathBuf, message: String },

    #[error("Invalid adjustment '{spec}': {reason}")]
    InvalidAdjustment { spec: String, reason: String },

    // Transparent wrappers for underlying crate errors
    /// Store error from cfgsync-store
    #[error(transparent)]
    Store(#[from] cfgsync_store::Error),

    /// Extension error from cfgsync-extensions
    #[error(transparent)]
    Extension(#[from] cfgsync_extensions::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn display_collection(collection: &str) -> &str {
    if collection.is_empty() {
        "default"
    } else {
        collection
    }
}
