//! Error types for the storage backends.
//!
//! Absence is a first-class outcome: a missing blob during bootstrap or
//! destroy is tolerated by the sync layer, so [`StorageError::NotFound`]
//! must stay distinguishable from transport failures.

/// Errors that can occur talking to an object storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The HTTP transport failed (connection, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a status the client does not accept.
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        /// HTTP status code received.
        status: u16,
        /// Request URL.
        url: String,
    },

    /// A local file operation failed while staging a download or upload.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend response carried no usable version tag.
    #[error("missing or invalid version tag in response")]
    MissingVersionTag,
}

impl StorageError {
    /// True when the error means the object simply does not exist.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
