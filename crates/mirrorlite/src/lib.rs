//! `SQLite` databases mirrored to object storage.
//!
//! Mirrorlite keeps a local `SQLite` file as a synchronized replica of a
//! single authoritative blob in a remote object store. Processes read and
//! write "a database" through the usual query surface; in the background,
//! local changes coalesce into rate-limited uploads and remote changes are
//! detected by version-tag polling and swapped in atomically.
//!
//! ```no_run
//! use mirrorlite::{Replica, ReplicaConfig, SwiftConfig};
//!
//! # async fn example() -> Result<(), mirrorlite::Error> {
//! let config = ReplicaConfig::swift(
//!     SwiftConfig::new("https://storage.example.net/v1/AUTH_abc", "token"),
//!     "databases",
//!     "index.sqlite",
//! );
//! let db = Replica::build(config)?;
//! db.connect().await?;
//!
//! db.query("CREATE TABLE IF NOT EXISTS lorem (info TEXT)", &[]).await?;
//! let mut row = mirrorlite::SqlMap::new();
//! row.insert("info".to_owned(), "first".into());
//! db.insert("lorem", &row).await?;
//!
//! db.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Writes never wait on the network: backup failures are logged and
//! retried with the next change, and the replica keeps serving local
//! reads and writes through remote outages.
//!
//! # Modules
//!
//! - [`config`] -- backend selection and validation
//! - [`local`] -- the purely local backing

pub mod config;
pub mod local;

use tokio::sync::broadcast;

pub use config::{BackendConfig, ConfigError, ReplicaConfig};
pub use local::LocalReplica;
pub use mirrorlite_store::{LocalStore, StoreError, TransactionError};
pub use mirrorlite_storage::{BlobStore, MemoryStore, StorageError, SwiftConfig, SwiftStore};
pub use mirrorlite_sync::{RemoteReplica, ReplicaStatus, SyncError, SyncTuning};
pub use mirrorlite_types::{
    BlobLocation, SqlMap, SqlRow, SqlValue, StoreEvent, TransactionId, VersionTag,
};

/// Errors surfaced by the public replica API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration was rejected at build time.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A query or transaction operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A lifecycle operation on a remote replica failed.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
}

/// A database replica: local-only or remote-synchronized.
///
/// Enum dispatch over the two backings; every query method delegates to
/// the same [`LocalStore`] underneath, so application code is identical
/// either way.
#[derive(Debug)]
pub enum Replica {
    /// Plain local database file.
    Local(LocalReplica),
    /// Local materialization synchronized with a remote blob.
    Remote(RemoteReplica),
}

impl Replica {
    /// Build a replica from configuration.
    ///
    /// Validates synchronously and constructs the storage client for
    /// remote backings; no database or network I/O happens until
    /// [`Replica::connect`].
    pub fn build(config: ReplicaConfig) -> Result<Self, Error> {
        config.validate()?;
        match config.backend {
            BackendConfig::Local { path } => Ok(Self::Local(LocalReplica::new(path))),
            BackendConfig::Swift {
                storage,
                container,
                filename,
            } => {
                let store = SwiftStore::new(&storage).map_err(ConfigError::Storage)?;
                Ok(Self::Remote(RemoteReplica::new(
                    BlobStore::Swift(store),
                    BlobLocation::new(container, filename),
                    config.tuning,
                )))
            }
            BackendConfig::Memory {
                store,
                container,
                filename,
            } => Ok(Self::Remote(RemoteReplica::new(
                BlobStore::Memory(store),
                BlobLocation::new(container, filename),
                config.tuning,
            ))),
        }
    }

    /// The local store serving this replica's queries.
    pub fn store(&self) -> &LocalStore {
        match self {
            Self::Local(replica) => replica.store(),
            Self::Remote(replica) => replica.store(),
        }
    }

    /// Subscribe to [`StoreEvent::Change`] and [`StoreEvent::RemoteUpdate`]
    /// notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.store().subscribe()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Open the replica. For remote backings this downloads the blob (or
    /// starts empty when absent) and begins synchronization. Idempotent.
    pub async fn connect(&self) -> Result<(), Error> {
        match self {
            Self::Local(replica) => replica.connect().await.map_err(Error::from),
            Self::Remote(replica) => replica.connect().await.map_err(Error::from),
        }
    }

    /// Close the replica: stop synchronization, release the connection,
    /// clean up temp files. Safe to call repeatedly.
    pub async fn close(&self) -> Result<(), Error> {
        match self {
            Self::Local(replica) => replica.close().await.map_err(Error::from),
            Self::Remote(replica) => replica.close().await.map_err(Error::from),
        }
    }

    /// Destroy the replica's durable state: the local file for local
    /// backings, the remote blob for remote ones (where failure is logged
    /// and swallowed, matching the availability-first policy).
    pub async fn destroy(&self) -> Result<(), Error> {
        match self {
            Self::Local(replica) => replica.destroy().await.map_err(Error::from),
            Self::Remote(replica) => {
                replica.destroy().await;
                Ok(())
            }
        }
    }

    /// Current connection and synchronization state.
    pub async fn status(&self) -> ReplicaStatus {
        match self {
            Self::Local(replica) => ReplicaStatus {
                connected: replica.store().is_connected().await,
                current: None,
                pending: None,
                last_backup_at: None,
            },
            Self::Remote(replica) => replica.status().await,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Execute an arbitrary statement; returns affected row count.
    pub async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<u64, Error> {
        Ok(self.store().query(sql, params).await?)
    }

    /// Run an arbitrary query; returns all rows.
    pub async fn query_rows(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, Error> {
        Ok(self.store().query_rows(sql, params).await?)
    }

    /// Run an arbitrary query; returns the first column of the first row.
    pub async fn query_value(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<SqlValue>, Error> {
        Ok(self.store().query_value(sql, params).await?)
    }

    /// Select all rows matching an equality predicate.
    pub async fn select(&self, table: &str, predicate: &SqlMap) -> Result<Vec<SqlRow>, Error> {
        Ok(self.store().select(table, predicate).await?)
    }

    /// Select the first matching row.
    pub async fn row(&self, table: &str, predicate: &SqlMap) -> Result<Option<SqlRow>, Error> {
        Ok(self.store().row(table, predicate).await?)
    }

    /// Select a single value from the first matching row.
    pub async fn value(
        &self,
        table: &str,
        predicate: &SqlMap,
        column: Option<&str>,
    ) -> Result<Option<SqlValue>, Error> {
        Ok(self.store().value(table, predicate, column).await?)
    }

    /// Select one column from every matching row.
    pub async fn col(
        &self,
        table: &str,
        predicate: &SqlMap,
        column: &str,
    ) -> Result<Vec<SqlValue>, Error> {
        Ok(self.store().col(table, predicate, column).await?)
    }

    /// Insert a single row.
    pub async fn insert(&self, table: &str, values: &SqlMap) -> Result<u64, Error> {
        Ok(self.store().insert(table, values).await?)
    }

    /// Insert many rows sharing one column list.
    pub async fn insert_bulk(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64, Error> {
        Ok(self.store().insert_bulk(table, columns, rows).await?)
    }

    /// Update matching rows; an empty value map is a no-op.
    pub async fn update(
        &self,
        table: &str,
        values: &SqlMap,
        predicate: &SqlMap,
    ) -> Result<u64, Error> {
        Ok(self.store().update(table, values, predicate).await?)
    }

    /// Single-row upsert keyed by the predicate.
    pub async fn replace(
        &self,
        table: &str,
        values: &SqlMap,
        predicate: &SqlMap,
    ) -> Result<(), Error> {
        Ok(self.store().replace(table, values, predicate).await?)
    }

    /// Delete matching rows.
    pub async fn delete(&self, table: &str, predicate: &SqlMap) -> Result<u64, Error> {
        Ok(self.store().delete(table, predicate).await?)
    }

    /// Remove every row of a table.
    pub async fn truncate(&self, table: &str) -> Result<u64, Error> {
        Ok(self.store().truncate(table).await?)
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Open a transaction. Only single-level transactions are supported;
    /// nesting is rejected with [`TransactionError::NestedUnsupported`].
    pub async fn begin(&self) -> Result<TransactionId, Error> {
        Ok(self.store().begin().await?)
    }

    /// Commit the transaction behind a handle.
    pub async fn commit(&self, id: TransactionId) -> Result<(), Error> {
        Ok(self.store().commit(id).await?)
    }

    /// Roll back the transaction behind a handle.
    pub async fn rollback(&self, id: TransactionId) -> Result<(), Error> {
        Ok(self.store().rollback(id).await?)
    }
}
