//! Poll and backup interval knobs.

use std::time::Duration;

/// Default spacing between remote head checks.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default minimum spacing between completed backups.
const DEFAULT_BACKUP_INTERVAL_SECS: u64 = 2;

/// Timing knobs for a remote replica.
///
/// The defaults bound network traffic for steady production use; tests
/// tighten both so convergence happens in milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct SyncTuning {
    /// Spacing between remote head checks.
    pub poll_interval: Duration,
    /// Minimum spacing between completed backups, enforced even when the
    /// upload itself was instantaneous.
    pub backup_interval: Duration,
}

impl SyncTuning {
    /// Production defaults: poll every 10 s, back up at most every 2 s.
    pub const fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            backup_interval: Duration::from_secs(DEFAULT_BACKUP_INTERVAL_SECS),
        }
    }

    /// Set the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the minimum backup spacing.
    #[must_use]
    pub const fn with_backup_interval(mut self, interval: Duration) -> Self {
        self.backup_interval = interval;
        self
    }
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self::new()
    }
}
