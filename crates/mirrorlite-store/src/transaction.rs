//! Transaction handle bookkeeping.
//!
//! The tracker maps opaque handles to nesting levels and enforces the
//! ordering rules around them. It performs no database I/O itself; the
//! store consults it before and after executing `BEGIN`/`COMMIT`/`ROLLBACK`
//! statements.
//!
//! The tracker can *represent* arbitrary nesting depths, but the store only
//! ever opens level 0: nested `begin` is an explicit, stated limitation and
//! is rejected rather than silently flattened, because callers depend on
//! the rejection.

use std::collections::HashMap;

use mirrorlite_types::TransactionId;

use crate::error::TransactionError;

/// Bookkeeping for open transaction handles.
///
/// Invariant: at most one entry exists at level 0 at any time. Entries are
/// removed on successful close and cleared wholesale when the connection
/// closes.
#[derive(Debug, Default)]
pub struct TransactionTracker {
    entries: HashMap<TransactionId, u32>,
}

impl TransactionTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// The level the next `open` would receive: one past the deepest open
    /// level, or 0 when nothing is open.
    pub fn next_level(&self) -> u32 {
        self.entries
            .values()
            .copied()
            .max()
            .map_or(0, |deepest| deepest.saturating_add(1))
    }

    /// Record a new open transaction at the next level and return its
    /// handle together with that level.
    pub fn open(&mut self) -> (TransactionId, u32) {
        let level = self.next_level();
        let id = TransactionId::new();
        self.entries.insert(id, level);
        (id, level)
    }

    /// Record a new top-level transaction, rejecting the attempt when any
    /// transaction is already open. The open transaction is left untouched
    /// on rejection.
    pub fn open_root(&mut self) -> Result<TransactionId, TransactionError> {
        if self.next_level() != 0 {
            return Err(TransactionError::NestedUnsupported);
        }
        let (id, _) = self.open();
        Ok(id)
    }

    /// The level recorded for a handle, if it is open.
    pub fn level(&self, id: TransactionId) -> Option<u32> {
        self.entries.get(&id).copied()
    }

    /// Close a handle, returning its level.
    ///
    /// Fails with [`TransactionError::UnknownHandle`] for a handle that was
    /// never issued or is already closed, and with
    /// [`TransactionError::OutOfOrder`] when a deeper level is still open.
    /// On failure the entry is retained, so closing the inner transaction
    /// first and retrying the outer one succeeds.
    pub fn close(&mut self, id: TransactionId) -> Result<u32, TransactionError> {
        let level = self
            .entries
            .get(&id)
            .copied()
            .ok_or(TransactionError::UnknownHandle(id))?;

        let deepest = self.entries.values().copied().max().unwrap_or(0);
        if deepest > level {
            return Err(TransactionError::OutOfOrder { level, deepest });
        }

        self.entries.remove(&id);
        Ok(level)
    }

    /// Re-record a handle after a failed engine `COMMIT`, so the caller can
    /// still roll the transaction back.
    pub fn reinstate(&mut self, id: TransactionId, level: u32) {
        self.entries.insert(id, level);
    }

    /// Number of open transactions.
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Drop all entries. Called when the connection closes.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn open_root_assigns_level_zero() {
        let mut tracker = TransactionTracker::new();
        let id = tracker.open_root().unwrap();
        assert_eq!(tracker.level(id), Some(0));
        assert_eq!(tracker.depth(), 1);
    }

    #[test]
    fn nested_open_root_is_rejected_and_harmless() {
        let mut tracker = TransactionTracker::new();
        let outer = tracker.open_root().unwrap();

        let err = tracker.open_root().unwrap_err();
        assert_eq!(err, TransactionError::NestedUnsupported);

        // The rejection left the open transaction untouched.
        assert_eq!(tracker.level(outer), Some(0));
        assert_eq!(tracker.depth(), 1);
        assert_eq!(tracker.close(outer).unwrap(), 0);
    }

    #[test]
    fn close_unknown_handle_fails() {
        let mut tracker = TransactionTracker::new();
        let stray = TransactionId::new();
        assert_eq!(
            tracker.close(stray).unwrap_err(),
            TransactionError::UnknownHandle(stray)
        );
    }

    #[test]
    fn close_is_rejected_while_deeper_level_open() {
        let mut tracker = TransactionTracker::new();
        let (outer, _) = tracker.open();
        let (inner, _) = tracker.open();

        // Outer first: rejected, both entries retained.
        let err = tracker.close(outer).unwrap_err();
        assert_eq!(err, TransactionError::OutOfOrder { level: 0, deepest: 1 });
        assert_eq!(tracker.depth(), 2);

        // Inner first, then outer: both succeed.
        assert_eq!(tracker.close(inner).unwrap(), 1);
        assert_eq!(tracker.close(outer).unwrap(), 0);
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn double_close_fails() {
        let mut tracker = TransactionTracker::new();
        let id = tracker.open_root().unwrap();
        tracker.close(id).unwrap();
        assert_eq!(
            tracker.close(id).unwrap_err(),
            TransactionError::UnknownHandle(id)
        );
    }

    #[test]
    fn reinstate_restores_a_closed_handle() {
        let mut tracker = TransactionTracker::new();
        let id = tracker.open_root().unwrap();
        let level = tracker.close(id).unwrap();

        tracker.reinstate(id, level);
        assert_eq!(tracker.level(id), Some(0));
        assert_eq!(tracker.close(id).unwrap(), 0);
    }

    #[test]
    fn clear_empties_the_tracker() {
        let mut tracker = TransactionTracker::new();
        let _ = tracker.open_root().unwrap();
        tracker.clear();
        assert_eq!(tracker.depth(), 0);
        assert_eq!(tracker.next_level(), 0);
    }
}
