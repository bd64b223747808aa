use std::path::Path;
use thiserror::Error;

/// Result type used by every core operation.
pub type Result<T> = std::result::Result<T, HelperError>;

/// Everything that can stop an operation.
///
/// Idempotent no-ops (a directive that is already active, a host that is
/// already mapped) are not errors; they are reported through
/// [`crate::core::engine::Outcome`].
#[derive(Debug, Error)]
pub enum HelperError {
    /// Some setup the operation depends on has not been done yet.
    #[error("{0}")]
    PreconditionFailed(String),

    /// A required argument was not supplied.
    #[error("{0}")]
    NotFound(String),

    /// A read, write or copy on the local filesystem failed.
    #[error("{action}: {source}")]
    Io {
        action: String,
        #[source]
        source: std::io::Error,
    },

    /// An external command (privileged copy, restart, editor) could not be
    /// started or exited unsuccessfully.
    #[error("command `{command}` failed: {status}")]
    CommandFailed { command: String, status: String },

    #[error("invalid line pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl HelperError {
    pub(crate) fn io(action: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            action: action.into(),
            source,
        }
    }

    pub(crate) fn io_at(verb: &str, path: &Path, source: std::io::Error) -> Self {
        Self::io(format!("Failed to {verb} {}", path.display()), source)
    }
}
