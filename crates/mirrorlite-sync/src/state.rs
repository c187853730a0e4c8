//! Known version tags and the divergence test.
//!
//! Per-instance, in-memory only, never persisted: after a restart the
//! first connect re-learns `current` from the download it performs.

use mirrorlite_types::VersionTag;

/// The version tags this instance recognizes as its own.
///
/// `current` is the tag last confirmed authoritative, via a completed
/// download or this instance's own completed upload. `pending` is the tag
/// of an upload that started but has not been confirmed yet. A remote tag
/// matching either one is *not* divergence: it is this instance's own
/// write observed from the other side.
#[derive(Debug, Clone, Default)]
pub struct KnownState {
    /// Last tag confirmed authoritative.
    pub current: Option<VersionTag>,
    /// Tag of an in-flight upload.
    pub pending: Option<VersionTag>,
}

impl KnownState {
    /// Fresh state with no known tags.
    pub const fn new() -> Self {
        Self {
            current: None,
            pending: None,
        }
    }

    /// Whether an observed remote tag means someone else changed the blob.
    ///
    /// Never divergent before the first confirmed state (`current` unset):
    /// that avoids a spurious re-download racing the initial connect. An
    /// unknown observation (`None`, from a failed head call) is never
    /// divergent either; the caller already fell back to `current`.
    pub fn is_divergent(&self, observed: Option<&VersionTag>) -> bool {
        let Some(current) = self.current.as_ref() else {
            return false;
        };
        let Some(observed) = observed else {
            return false;
        };
        observed != current && Some(observed) != self.pending.as_ref()
    }

    /// Record a completed download as the authoritative state.
    pub fn record_download(&mut self, tag: VersionTag) {
        self.current = Some(tag);
    }

    /// Record that an upload of `tag` has started.
    pub fn begin_upload(&mut self, tag: VersionTag) {
        self.pending = Some(tag);
    }

    /// Record that the upload of `tag` was accepted remotely.
    pub fn complete_upload(&mut self, tag: VersionTag) {
        self.current = Some(tag);
        self.pending = None;
    }
}
