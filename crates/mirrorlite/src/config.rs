//! Replica configuration and backend selection.
//!
//! A replica is either purely local (one database file, no network) or
//! remote-synchronized (a local materialization of an object-store blob).
//! The choice is a tagged variant selected at build time -- composition
//! over a subclass hierarchy -- and validated synchronously, so a
//! misconfigured replica fails at construction rather than at first use.

use std::path::PathBuf;

use mirrorlite_storage::{MemoryStore, StorageError, SwiftConfig};
use mirrorlite_sync::SyncTuning;

/// Which backing a replica uses.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// A plain local database file; no synchronization.
    Local {
        /// Path of the database file.
        path: PathBuf,
    },
    /// A local materialization of a blob in Swift-compatible storage.
    Swift {
        /// Storage endpoint and credentials.
        storage: SwiftConfig,
        /// Container holding the database blob.
        container: String,
        /// Object name of the database blob.
        filename: String,
    },
    /// A local materialization of a blob in shared in-memory storage
    /// (tests and local development).
    Memory {
        /// The shared store; clones see the same blobs.
        store: MemoryStore,
        /// Container holding the database blob.
        container: String,
        /// Object name of the database blob.
        filename: String,
    },
}

/// Complete replica configuration.
#[derive(Debug, Clone)]
pub struct ReplicaConfig {
    /// Backend selection.
    pub backend: BackendConfig,
    /// Poll and backup intervals for remote backings.
    pub tuning: SyncTuning,
}

impl ReplicaConfig {
    /// Configuration for a plain local database file.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendConfig::Local { path: path.into() },
            tuning: SyncTuning::new(),
        }
    }

    /// Configuration for a Swift-synchronized replica.
    pub fn swift(
        storage: SwiftConfig,
        container: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            backend: BackendConfig::Swift {
                storage,
                container: container.into(),
                filename: filename.into(),
            },
            tuning: SyncTuning::new(),
        }
    }

    /// Configuration for an in-memory-synchronized replica.
    pub fn memory(
        store: MemoryStore,
        container: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            backend: BackendConfig::Memory {
                store,
                container: container.into(),
                filename: filename.into(),
            },
            tuning: SyncTuning::new(),
        }
    }

    /// Override the poll and backup intervals.
    #[must_use]
    pub const fn with_tuning(mut self, tuning: SyncTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.backend {
            BackendConfig::Local { path } => {
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::EmptyPath);
                }
            }
            BackendConfig::Swift {
                container, filename, ..
            }
            | BackendConfig::Memory {
                container, filename, ..
            } => {
                if container.is_empty() {
                    return Err(ConfigError::EmptyContainer);
                }
                if filename.is_empty() {
                    return Err(ConfigError::EmptyFilename);
                }
            }
        }
        Ok(())
    }
}

/// Unsupported or missing backend configuration. Fatal, raised
/// synchronously at construction.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The local database path is empty.
    #[error("local database path must not be empty")]
    EmptyPath,

    /// The remote container name is empty.
    #[error("container must not be empty")]
    EmptyContainer,

    /// The remote object name is empty.
    #[error("filename must not be empty")]
    EmptyFilename,

    /// The storage client could not be constructed.
    #[error("failed to initialize storage client: {0}")]
    Storage(#[from] StorageError),
}
