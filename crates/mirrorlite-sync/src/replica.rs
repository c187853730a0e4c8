//! Lifecycle orchestration and connection swapping.
//!
//! A [`RemoteReplica`] binds a [`LocalStore`] to a remote blob. Connect
//! materializes the blob into a fresh temp file and starts the two
//! background tasks; close cancels them, closes the connection, and
//! removes the temp file; destroy deletes the remote blob.
//!
//! The connection swap discipline lives here, in [`resync`]: the freshly
//! downloaded copy is confirmed on disk *before* the old connection is
//! closed, so a failed download never takes a healthy replica offline. The
//! old connection is fully closed before the new one opens, and the
//! replaced temp file is removed afterwards. Connect, resync, and close
//! all serialize on one async mutex, which is what makes "at most one
//! resynchronization in flight" hold.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use mirrorlite_store::LocalStore;
use mirrorlite_storage::BlobStore;
use mirrorlite_types::{BlobLocation, StoreEvent, VersionTag};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::SyncError;
use crate::state::KnownState;
use crate::tuning::SyncTuning;
use crate::{backup, lock, poll, temp_db_path};

/// State shared between the replica handle and its background tasks.
#[derive(Debug)]
pub(crate) struct Shared {
    /// The hot-swappable local store.
    pub(crate) store: LocalStore,
    /// Remote blob backend.
    pub(crate) storage: BlobStore,
    /// Remote blob identity.
    pub(crate) location: BlobLocation,
    /// Version tags this instance recognizes as its own.
    pub(crate) state: Mutex<KnownState>,
    /// The temp file currently backing the connection.
    pub(crate) tmp_path: Mutex<Option<PathBuf>>,
    /// Serializes connect, resync, and close.
    pub(crate) swap_lock: tokio::sync::Mutex<()>,
    /// Cancellation for the current generation of background tasks.
    /// Replaced on every connect so a closed replica can reconnect.
    pub(crate) cancel: Mutex<CancellationToken>,
    /// Completion time of the most recent successful backup.
    pub(crate) last_backup_at: Mutex<Option<DateTime<Utc>>>,
}

impl Shared {
    /// The cancellation token of the current task generation.
    pub(crate) fn cancel_token(&self) -> CancellationToken {
        lock(&self.cancel).clone()
    }
}

/// Point-in-time view of a replica's synchronization state.
#[derive(Debug, Clone)]
pub struct ReplicaStatus {
    /// Whether a local connection is open.
    pub connected: bool,
    /// Last version tag confirmed authoritative.
    pub current: Option<VersionTag>,
    /// Tag of an in-flight upload, if any.
    pub pending: Option<VersionTag>,
    /// Completion time of the most recent successful backup.
    pub last_backup_at: Option<DateTime<Utc>>,
}

/// A local database kept in sync with a remote blob.
#[derive(Debug)]
pub struct RemoteReplica {
    shared: Arc<Shared>,
    tuning: SyncTuning,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RemoteReplica {
    /// Create a replica bound to `location` on `storage`. No I/O happens
    /// until [`RemoteReplica::connect`].
    pub fn new(storage: BlobStore, location: BlobLocation, tuning: SyncTuning) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: LocalStore::new(temp_db_path("db")),
                storage,
                location,
                state: Mutex::new(KnownState::new()),
                tmp_path: Mutex::new(None),
                swap_lock: tokio::sync::Mutex::new(()),
                cancel: Mutex::new(CancellationToken::new()),
                last_backup_at: Mutex::new(None),
            }),
            tuning,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// The local store serving queries for this replica.
    pub fn store(&self) -> &LocalStore {
        &self.shared.store
    }

    /// Subscribe to change and remote-update notifications.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StoreEvent> {
        self.shared.store.subscribe()
    }

    /// Materialize the remote blob locally and start synchronization.
    ///
    /// Idempotent: while a connection is open, further calls return
    /// immediately and perform no network traffic. A missing remote blob
    /// (or a failed download on this first materialization) is tolerated
    /// by starting from an empty database; the first backup will create
    /// the blob.
    pub async fn connect(&self) -> Result<(), SyncError> {
        let _guard = self.shared.swap_lock.lock().await;
        if self.shared.store.is_connected().await {
            return Ok(());
        }

        let fresh_path = temp_db_path("db");
        match self
            .shared
            .storage
            .download_to(&self.shared.location, &fresh_path)
            .await
        {
            Ok(tag) => {
                tracing::debug!(location = %self.shared.location, tag = %tag, "Downloaded remote database");
                lock(&self.shared.state).record_download(tag);
            }
            Err(err) => {
                if err.is_not_found() {
                    tracing::debug!(
                        location = %self.shared.location,
                        "Remote blob absent; starting with an empty database"
                    );
                } else {
                    tracing::warn!(
                        location = %self.shared.location,
                        error = %err,
                        "Download failed on connect; starting with an empty database"
                    );
                }
                // Discard whatever the failed download left behind.
                let _ = tokio::fs::remove_file(&fresh_path).await;
            }
        }

        self.shared
            .store
            .reconnect_at(&fresh_path)
            .await
            .map_err(SyncError::Swap)?;
        *lock(&self.shared.tmp_path) = Some(fresh_path);

        // Fresh task generation. Subscribing before the spawn means a
        // write issued immediately after connect cannot slip past the
        // backup worker.
        let token = CancellationToken::new();
        *lock(&self.shared.cancel) = token.clone();
        let events = self.shared.store.subscribe();

        let mut tasks = lock(&self.tasks);
        tasks.push(tokio::spawn(backup::run(
            Arc::clone(&self.shared),
            events,
            token.clone(),
            self.tuning.backup_interval,
        )));
        tasks.push(tokio::spawn(poll::run(
            Arc::clone(&self.shared),
            token,
            self.tuning.poll_interval,
        )));

        tracing::info!(location = %self.shared.location, "Replica connected");
        Ok(())
    }

    /// Stop synchronization, close the connection, and remove the local
    /// temp file. Safe to call repeatedly.
    pub async fn close(&self) -> Result<(), SyncError> {
        self.shared.cancel_token().cancel();

        let handles: Vec<JoinHandle<()>> = lock(&self.tasks).drain(..).collect();
        for handle in handles {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "Background task ended abnormally");
            }
        }

        let _guard = self.shared.swap_lock.lock().await;
        self.shared.store.close().await.map_err(SyncError::Swap)?;

        if let Some(path) = lock(&self.shared.tmp_path).take() {
            if let Err(err) = tokio::fs::remove_file(&path).await {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "Failed to remove local temp file"
                );
            }
        }

        tracing::info!(location = %self.shared.location, "Replica closed");
        Ok(())
    }

    /// Delete the remote blob. Failure (including the blob already being
    /// absent) is logged and swallowed.
    pub async fn destroy(&self) {
        tracing::debug!(location = %self.shared.location, "Destroying remote database");
        if let Err(err) = self.shared.storage.delete(&self.shared.location).await {
            tracing::warn!(
                location = %self.shared.location,
                error = %err,
                "Failed to delete remote blob during destroy"
            );
        }
    }

    /// Current synchronization state.
    pub async fn status(&self) -> ReplicaStatus {
        let connected = self.shared.store.is_connected().await;
        let state = lock(&self.shared.state).clone();
        ReplicaStatus {
            connected,
            current: state.current,
            pending: state.pending,
            last_backup_at: *lock(&self.shared.last_backup_at),
        }
    }
}

/// Replace the local materialization with a fresh download.
///
/// Called by the poll loop on genuine divergence. Ordering matters: the
/// download is confirmed before the old connection closes, the old
/// connection is fully closed before the new one opens, and only then is
/// the replaced temp file deleted and `RemoteUpdate` announced.
pub(crate) async fn resync(shared: &Shared) -> Result<(), SyncError> {
    let _guard = shared.swap_lock.lock().await;
    if shared.cancel_token().is_cancelled() {
        return Ok(());
    }

    let fresh_path = temp_db_path("db");
    let tag = match shared
        .storage
        .download_to(&shared.location, &fresh_path)
        .await
    {
        Ok(tag) => tag,
        Err(err) => {
            let _ = tokio::fs::remove_file(&fresh_path).await;
            return Err(SyncError::Download(err));
        }
    };

    let old_path = lock(&shared.tmp_path).clone();
    shared
        .store
        .reconnect_at(&fresh_path)
        .await
        .map_err(SyncError::Swap)?;
    *lock(&shared.tmp_path) = Some(fresh_path);
    lock(&shared.state).record_download(tag);

    if let Some(old) = old_path {
        if let Err(err) = tokio::fs::remove_file(&old).await {
            tracing::warn!(
                path = %old.display(),
                error = %err,
                "Failed to remove replaced temp file"
            );
        }
    }

    shared.store.notify(StoreEvent::RemoteUpdate);
    tracing::info!(location = %shared.location, "Replica resynchronized from remote");
    Ok(())
}
