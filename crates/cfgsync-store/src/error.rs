//! Error types for cfgsync-store

use std::path::PathBuf;

/// Result type for cfgsync-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in store operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Record or collection name failed syntactic validation
    #[error("Invalid configuration name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Record payload violates structural constraints
    #[error("Invalid value in '{name}' at key '{key}': {reason}")]
    InvalidValue {
        name: String,
        key: String,
        reason: String,
    },

    /// The codec cannot represent a value in the record
    #[error("{format} cannot encode this record: {message}")]
    UnsupportedDataType { format: String, message: String },

    #[error("Failed to decode {format} data: {message}")]
    Decode { format: String, message: String },

    /// A stored record could not be decoded
    #[error("Corrupt {format} record at {path}: {message}")]
    Corrupt {
        path: PathBuf,
        format: String,
        message: String,
    },

    /// A storage filter aborted the operation
    #[error("Filter {filter} rejected '{name}': {reason}")]
    Filtered {
        filter: String,
        name: String,
        reason: String,
    },

    #[error("Unsupported record format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Attach the on-disk location to a decode failure.
    pub(crate) fn at_path(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::Decode { format, message } => Self::Corrupt {
                path: path.into(),
                format,
                message,
            },
            other => other,
        }
    }

    /// True for errors raised by name or value validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidName { .. } | Self::InvalidValue { .. })
    }
}
