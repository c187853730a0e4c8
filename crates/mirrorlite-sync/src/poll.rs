//! Periodic head/divergence/resync loop.
//!
//! Each iteration asks the remote for its current version tag and resyncs
//! when the answer matches neither of the tags this instance recognizes
//! as its own. Iterations are strictly serialized: a resync completes (or
//! fails) before the sleep starts, so at most one resynchronization is
//! ever in flight and each poll's divergence check sees the outcome of
//! the previous one.
//!
//! The etag-comparison poll is an eventual-consistency heuristic, not a
//! strong guarantee. A third writer's upload landing between the head
//! call and the divergence check can be missed for one interval; the next
//! poll converges on it.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::lock;
use crate::replica::{self, Shared};

/// Poll loop. Runs until cancelled.
pub(crate) async fn run(shared: Arc<Shared>, cancel: CancellationToken, interval: Duration) {
    loop {
        if cancel.is_cancelled() {
            break;
        }

        let observed = match shared.storage.head(&shared.location).await {
            Ok(tag) => Some(tag),
            Err(err) => {
                // Best effort: treat the head as unknown and fall back to
                // the last known state, which never reads as divergence.
                if err.is_not_found() {
                    tracing::debug!(location = %shared.location, "Remote blob absent during poll");
                } else {
                    tracing::debug!(
                        location = %shared.location,
                        error = %err,
                        "Head failed; using last known tag"
                    );
                }
                lock(&shared.state).current.clone()
            }
        };

        let divergent = lock(&shared.state).is_divergent(observed.as_ref());
        if divergent {
            tracing::debug!(
                location = %shared.location,
                observed = ?observed,
                "Remote changed externally; resynchronizing"
            );
            if let Err(err) = replica::resync(&shared).await {
                tracing::warn!(
                    location = %shared.location,
                    error = %err,
                    "Resynchronization failed; keeping current connection"
                );
            }
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }
    tracing::debug!("Sync loop stopped");
}
