//! Single-flight coalescing upload worker.
//!
//! One worker task per replica consumes the store's change notifications.
//! Because there is exactly one worker, single-flight holds by
//! construction: a second upload cannot start while one is running.
//! Signals arriving during a run (or during the spacing sleep after it)
//! buffer in the channel and collapse into the next run, which snapshots
//! whatever the database contains *then* -- so a burst of N writes costs
//! far fewer than N uploads and the final upload still reflects all N.
//!
//! Failures are logged and swallowed. The writer that triggered the run
//! never sees them, and the next change retries with the latest state;
//! coalescing is the retry mechanism.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mirrorlite_storage::digest_file;
use mirrorlite_types::StoreEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tokio_util::sync::CancellationToken;

use crate::error::BackupError;
use crate::replica::Shared;
use crate::{lock, temp_db_path};

/// Worker loop. Runs until cancelled or the event channel closes.
pub(crate) async fn run(
    shared: Arc<Shared>,
    mut events: broadcast::Receiver<StoreEvent>,
    cancel: CancellationToken,
    interval: Duration,
) {
    loop {
        let received = tokio::select! {
            () = cancel.cancelled() => break,
            received = events.recv() => received,
        };

        match received {
            Err(broadcast::error::RecvError::Closed) => break,
            // A lagged receiver means at least one change was dropped;
            // that is still "changes happened".
            Ok(StoreEvent::Change) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            // Remote swaps are not local writes; nothing to upload.
            Ok(StoreEvent::RemoteUpdate) => continue,
        }

        let coalesced = drain_pending(&mut events);
        tracing::debug!(signals = coalesced.saturating_add(1), "Running backup");

        if let Err(err) = run_backup(&shared).await {
            tracing::warn!(error = %err, "Backup failed; next change retries with latest state");
        }

        // Minimum spacing between completed backups, even when the upload
        // was instantaneous. Changes queued meanwhile coalesce into the
        // next run.
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }
    tracing::debug!("Backup worker stopped");
}

/// Drain every queued signal, returning how many change signals collapsed
/// into this run.
fn drain_pending(events: &mut broadcast::Receiver<StoreEvent>) -> u64 {
    let mut count: u64 = 0;
    loop {
        match events.try_recv() {
            Ok(StoreEvent::Change) => count = count.saturating_add(1),
            Ok(StoreEvent::RemoteUpdate) => {}
            Err(TryRecvError::Lagged(skipped)) => count = count.saturating_add(skipped),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    count
}

/// One backup run: snapshot, hash, upload, record tags.
async fn run_backup(shared: &Shared) -> Result<(), BackupError> {
    let snapshot_path = temp_db_path("backup");

    shared
        .store
        .snapshot_to(&snapshot_path)
        .await
        .map_err(BackupError::Snapshot)?;

    let result = upload_snapshot(shared, &snapshot_path).await;

    // The snapshot file is ours alone; remove it whether or not the
    // upload succeeded.
    if let Err(err) = tokio::fs::remove_file(&snapshot_path).await {
        tracing::warn!(
            path = %snapshot_path.display(),
            error = %err,
            "Failed to remove backup temp file"
        );
    }

    result
}

async fn upload_snapshot(shared: &Shared, snapshot_path: &Path) -> Result<(), BackupError> {
    let tag = digest_file(snapshot_path)
        .await
        .map_err(BackupError::Hash)?;

    // Mark the upload in flight before any bytes move, so the poll loop
    // does not mistake our own write landing remotely for divergence.
    lock(&shared.state).begin_upload(tag.clone());

    shared
        .storage
        .upload(&shared.location, snapshot_path, &tag)
        .await
        .map_err(BackupError::Upload)?;

    lock(&shared.state).complete_upload(tag.clone());
    *lock(&shared.last_backup_at) = Some(Utc::now());

    tracing::debug!(tag = %tag, location = %shared.location, "Backup uploaded");
    Ok(())
}
