//! The purely local backing.
//!
//! A thin lifecycle wrapper over [`LocalStore`] for replicas that skip
//! synchronization entirely: same query surface, same events, no
//! background tasks and no temp files -- the database file lives where
//! the caller put it.

use std::path::PathBuf;

use mirrorlite_store::{LocalStore, StoreError};
use mirrorlite_types::StoreEvent;
use tokio::sync::broadcast;

/// A plain local database with no remote counterpart.
#[derive(Debug)]
pub struct LocalReplica {
    store: LocalStore,
}

impl LocalReplica {
    /// Create a replica over a database file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            store: LocalStore::new(path),
        }
    }

    /// The store serving queries.
    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }

    /// Open the database file (creating it when absent). Idempotent.
    pub async fn connect(&self) -> Result<(), StoreError> {
        self.store.connect().await
    }

    /// Close the connection. Safe to call repeatedly.
    pub async fn close(&self) -> Result<(), StoreError> {
        self.store.close().await
    }

    /// Remove the database file, closing the connection first.
    pub async fn destroy(&self) -> Result<(), StoreError> {
        tracing::debug!(path = %self.store.path().display(), "Destroying local database");
        self.store.destroy().await
    }
}
