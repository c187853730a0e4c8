//! Error types for the replication engine.
//!
//! Background failures (backup runs, polls, resyncs) are contained: they
//! are logged by the worker that hit them and never surface to the writer
//! whose statement triggered the work. The types still carry full sources
//! so the logs say which phase failed and why.

use mirrorlite_store::StoreError;
use mirrorlite_storage::StorageError;

/// Failure during a single backup run.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// The engine's atomic snapshot failed (commonly: a transaction was
    /// open at snapshot time; the next run retries after the commit).
    #[error("snapshot failed: {0}")]
    Snapshot(#[source] StoreError),

    /// Hashing the snapshot file failed.
    #[error("hash failed: {0}")]
    Hash(#[source] StorageError),

    /// Uploading the snapshot failed.
    #[error("upload failed: {0}")]
    Upload(#[source] StorageError),
}

/// Failure during connect, polling, or resynchronization.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Downloading the remote blob failed.
    #[error("download failed: {0}")]
    Download(#[source] StorageError),

    /// Closing or reopening the local connection failed.
    #[error("connection swap failed: {0}")]
    Swap(#[source] StoreError),
}
