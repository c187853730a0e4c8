//! Store notifications.
//!
//! The store broadcasts a [`StoreEvent`] after every successful mutating
//! statement and after every remote-driven connection swap. Delivery is
//! at-least-once: a lagging receiver may observe fewer events than were
//! sent, but never zero when at least one mutation happened, so consumers
//! that coalesce (the backup queue does) lose nothing.

use serde::{Deserialize, Serialize};

/// Notification emitted by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreEvent {
    /// A mutating statement (insert/update/delete/truncate/commit) succeeded.
    Change,
    /// The local connection was replaced with a freshly downloaded copy.
    RemoteUpdate,
}
