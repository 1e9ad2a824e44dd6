/// Errors that can occur while reading the manifest or toggling extensions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The manifest record does not have the expected shape.
    #[error("invalid extension manifest: {reason}")]
    InvalidManifest { reason: String },

    /// A configured install/uninstall command exited unsuccessfully.
    #[error("{action} command `{command}` failed{}", .exit_code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    CommandFailed {
        action: String,
        command: String,
        exit_code: Option<i32>,
    },

    /// The command could not be started at all.
    #[error("failed to run {action} command `{command}`: {source}")]
    CommandSpawn {
        action: String,
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A handler refused to toggle an extension.
    #[error("cannot {action} {extension}: {reason}")]
    Rejected {
        action: String,
        extension: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
