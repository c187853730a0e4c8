//! In-memory storage backend.
//!
//! Keeps blobs in a shared map keyed by (container, filename). Clones share
//! the same map, so a test can hand one `MemoryStore` to two replicas and
//! they see each other's uploads exactly as they would through a real
//! remote container. Version tags use the same digest scheme as the
//! networked backends.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mirrorlite_types::{BlobLocation, VersionTag};

use crate::error::StorageError;

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    tag: VersionTag,
}

/// Shared in-memory blob store for tests and local development.
///
/// Tracks how many uploads and downloads it served, so tests can assert
/// coalescing behavior ("N writes produced fewer than N uploads") and the
/// no-redundant-download guarantee directly.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: Arc<Mutex<HashMap<(String, String), StoredBlob>>>,
    uploads: Arc<AtomicU64>,
    downloads: Arc<AtomicU64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(location: &BlobLocation) -> (String, String) {
        (location.container.clone(), location.filename.clone())
    }

    /// Current version tag of a blob.
    pub fn head(&self, location: &BlobLocation) -> Result<VersionTag, StorageError> {
        lock(&self.blobs)
            .get(&Self::key(location))
            .map(|blob| blob.tag.clone())
            .ok_or_else(|| StorageError::NotFound(location.to_string()))
    }

    /// Write a blob's bytes to `destination` and return its version tag.
    pub async fn download_to(
        &self,
        location: &BlobLocation,
        destination: &Path,
    ) -> Result<VersionTag, StorageError> {
        let blob = lock(&self.blobs)
            .get(&Self::key(location))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(location.to_string()))?;

        tokio::fs::write(destination, &blob.bytes).await?;
        self.downloads.fetch_add(1, Ordering::Relaxed);
        Ok(blob.tag)
    }

    /// Store the file at `source` under `location`, tagged with the
    /// caller-computed content digest.
    pub async fn upload(
        &self,
        location: &BlobLocation,
        source: &Path,
        tag: &VersionTag,
    ) -> Result<(), StorageError> {
        let bytes = tokio::fs::read(source).await?;
        lock(&self.blobs).insert(
            Self::key(location),
            StoredBlob {
                bytes,
                tag: tag.clone(),
            },
        );
        self.uploads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Remove a blob. Fails with [`StorageError::NotFound`] when absent.
    pub fn delete(&self, location: &BlobLocation) -> Result<(), StorageError> {
        lock(&self.blobs)
            .remove(&Self::key(location))
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(location.to_string()))
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        lock(&self.blobs).len()
    }

    /// True when no blobs are stored.
    pub fn is_empty(&self) -> bool {
        lock(&self.blobs).is_empty()
    }

    /// Total uploads served since construction.
    pub fn upload_count(&self) -> u64 {
        self.uploads.load(Ordering::Relaxed)
    }

    /// Total downloads served since construction.
    pub fn download_count(&self) -> u64 {
        self.downloads.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::hash::digest_bytes;

    use super::*;

    fn location() -> BlobLocation {
        BlobLocation::new("tests", "index.sqlite")
    }

    #[tokio::test]
    async fn head_of_missing_blob_is_not_found() {
        let store = MemoryStore::new();
        let err = store.head(&location()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn upload_then_head_returns_the_given_tag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        tokio::fs::write(&path, b"payload").await.unwrap();

        let store = MemoryStore::new();
        let tag = digest_bytes(b"payload");
        store.upload(&location(), &path, &tag).await.unwrap();

        assert_eq!(store.head(&location()).unwrap(), tag);
    }

    #[tokio::test]
    async fn download_round_trips_the_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.bin");
        let dest = dir.path().join("out.bin");
        tokio::fs::write(&source, b"bytes").await.unwrap();

        let store = MemoryStore::new();
        let tag = digest_bytes(b"bytes");
        store.upload(&location(), &source, &tag).await.unwrap();

        let got = store.download_to(&location(), &dest).await.unwrap();
        assert_eq!(got, tag);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn clones_share_the_same_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.bin");
        tokio::fs::write(&path, b"x").await.unwrap();

        let store = MemoryStore::new();
        let view = store.clone();
        store
            .upload(&location(), &path, &digest_bytes(b"x"))
            .await
            .unwrap();

        assert!(view.head(&location()).is_ok());
    }

    #[tokio::test]
    async fn delete_removes_and_second_delete_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.bin");
        tokio::fs::write(&path, b"x").await.unwrap();

        let store = MemoryStore::new();
        store
            .upload(&location(), &path, &digest_bytes(b"x"))
            .await
            .unwrap();

        store.delete(&location()).unwrap();
        assert!(store.delete(&location()).unwrap_err().is_not_found());
        assert!(store.head(&location()).unwrap_err().is_not_found());
    }
}
