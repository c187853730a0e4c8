//! Opaque content version tags.
//!
//! A [`VersionTag`] identifies the exact byte content of a remote blob.
//! Two equal tags mean the same bytes; tag equality is the *only* test the
//! sync layer performs when deciding whether the remote copy diverged from
//! what this instance already knows. No byte-level diffing ever happens.
//!
//! Tags come from two places: the storage backend's version header on
//! head/download, and the local content digest computed before upload.
//! Both sides of a comparison must therefore use the same digest scheme,
//! which the storage backends guarantee.

use serde::{Deserialize, Serialize};

/// Opaque, comparable identifier of a blob's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionTag(String);

impl VersionTag {
    /// Wrap a raw tag string (digest hex or storage `ETag`).
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Return the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the tag, returning the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VersionTag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

impl From<&str> for VersionTag {
    fn from(tag: &str) -> Self {
        Self(tag.to_owned())
    }
}
