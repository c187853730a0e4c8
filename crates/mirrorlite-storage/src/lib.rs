//! Object storage backends and content hashing for Mirrorlite.
//!
//! The sync layer treats the remote side as a key-value blob service with
//! four operations (head, download, upload, delete) and an opaque version
//! tag per blob. This crate provides that service:
//!
//! - [`swift`] -- OpenStack Swift flavored HTTP backend over `reqwest`
//! - [`memory`] -- shared in-memory backend for tests and local development
//! - [`hash`] -- the SHA-256 content digest both backends tag blobs with
//! - [`error`] -- error types, with absence distinguishable from failure
//!
//! Backends dispatch through the [`BlobStore`] enum rather than a trait
//! object, because async methods are not dyn-compatible in Rust.

pub mod error;
pub mod hash;
pub mod memory;
pub mod swift;

use std::path::Path;

use mirrorlite_types::{BlobLocation, VersionTag};

pub use error::StorageError;
pub use hash::{digest_bytes, digest_file};
pub use memory::MemoryStore;
pub use swift::{SwiftConfig, SwiftStore};

/// An object storage backend.
///
/// Enum dispatch over the concrete backends (the same pattern the rest of
/// the workspace uses at async seams).
#[derive(Debug, Clone)]
pub enum BlobStore {
    /// Swift-compatible HTTP object storage.
    Swift(SwiftStore),
    /// Shared in-memory storage.
    Memory(MemoryStore),
}

impl BlobStore {
    /// Current version tag of a blob. Fails with
    /// [`StorageError::NotFound`] when the blob does not exist.
    pub async fn head(&self, location: &BlobLocation) -> Result<VersionTag, StorageError> {
        match self {
            Self::Swift(store) => store.head(location).await,
            Self::Memory(store) => store.head(location),
        }
    }

    /// Download a blob into `destination`, returning its version tag.
    pub async fn download_to(
        &self,
        location: &BlobLocation,
        destination: &Path,
    ) -> Result<VersionTag, StorageError> {
        match self {
            Self::Swift(store) => store.download_to(location, destination).await,
            Self::Memory(store) => store.download_to(location, destination).await,
        }
    }

    /// Upload the file at `source` as the blob's new content, tagged with
    /// its content digest.
    pub async fn upload(
        &self,
        location: &BlobLocation,
        source: &Path,
        tag: &VersionTag,
    ) -> Result<(), StorageError> {
        match self {
            Self::Swift(store) => store.upload(location, source, tag).await,
            Self::Memory(store) => store.upload(location, source, tag).await,
        }
    }

    /// Delete a blob. Fails with [`StorageError::NotFound`] when absent.
    pub async fn delete(&self, location: &BlobLocation) -> Result<(), StorageError> {
        match self {
            Self::Swift(store) => store.delete(location).await,
            Self::Memory(store) => store.delete(location),
        }
    }

    /// Human-readable backend name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Swift(_) => "swift",
            Self::Memory(_) => "memory",
        }
    }
}
