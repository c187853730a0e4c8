//! Backup queue, poll loop, and replica lifecycle for Mirrorlite.
//!
//! This crate is the replication engine. It binds a local store to a
//! remote blob and keeps the two converging from both directions:
//!
//! - the [`backup`] worker turns bursty local change notifications into a
//!   bounded rate of coalesced uploads (push side);
//! - the [`poll`] loop compares the remote version tag against what this
//!   instance already knows and swaps in a fresh download on genuine
//!   divergence (pull side);
//! - [`replica`] orchestrates connect/close/destroy around both.
//!
//! The push and pull sides share one piece of memory, the
//! [`state::KnownState`] current/pending tag pair. It exists so the poll
//! loop can tell "the remote changed because *I* just uploaded it" apart
//! from "someone else wrote it" without downloading anything.
//!
//! # Modules
//!
//! - [`state`] -- known version tags and the divergence test
//! - [`backup`] -- single-flight coalescing upload worker
//! - [`poll`] -- periodic head/divergence/resync loop
//! - [`replica`] -- lifecycle orchestration and connection swapping
//! - [`tuning`] -- poll and backup interval knobs
//! - [`error`] -- error types

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod backup;
pub mod error;
pub mod poll;
pub mod replica;
pub mod state;
pub mod tuning;

pub use error::{BackupError, SyncError};
pub use replica::{RemoteReplica, ReplicaStatus};
pub use state::KnownState;
pub use tuning::SyncTuning;

/// Lock a std mutex, recovering the guard if a panicking thread poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A unique temp file path for a database copy.
///
/// Every materialization gets its own file: resynchronization replaces the
/// path wholesale rather than rewriting in place, so a half-written
/// download can never corrupt the file a live connection is using.
pub(crate) fn temp_db_path(kind: &str) -> PathBuf {
    std::env::temp_dir().join(format!("mirrorlite-{kind}-{}.sqlite", uuid::Uuid::new_v4()))
}
