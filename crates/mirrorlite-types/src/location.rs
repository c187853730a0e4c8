//! Remote blob addressing.

use serde::{Deserialize, Serialize};

/// The remote location of a replica's authoritative blob.
///
/// A replica is identified by the (container, filename) pair inside the
/// object store. The local temp file backing the open connection is an
/// implementation detail and changes on every resynchronization; the blob
/// location is the stable identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobLocation {
    /// Container (bucket) holding the database blob.
    pub container: String,
    /// Object name of the database blob within the container.
    pub filename: String,
}

impl BlobLocation {
    /// Create a new blob location.
    pub fn new(container: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            filename: filename.into(),
        }
    }
}

impl core::fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.container, self.filename)
    }
}
