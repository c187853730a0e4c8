//! Content hashing for version tags.
//!
//! SHA-256 over the raw file bytes, hex-encoded. The digest doubles as the
//! upload's integrity check and as the [`VersionTag`] the sync layer
//! compares against the remote head, so every backend must tag blobs with
//! exactly this function's output.

use std::path::Path;

use mirrorlite_types::VersionTag;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::error::StorageError;

/// Read buffer size for file digests.
const DIGEST_BUFFER: usize = 64 * 1024;

/// Digest a byte slice into a version tag.
pub fn digest_bytes(bytes: &[u8]) -> VersionTag {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    VersionTag::new(hex::encode(hasher.finalize()))
}

/// Digest a file's content into a version tag without loading it whole.
pub async fn digest_file(path: &Path) -> Result<VersionTag, StorageError> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; DIGEST_BUFFER];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(buffer.get(..read).unwrap_or(&[]));
    }

    Ok(VersionTag::new(hex::encode(hasher.finalize())))
}
