//! OpenStack Swift flavored HTTP backend.
//!
//! Talks to a pre-authenticated storage endpoint: the caller resolves
//! credentials out of band and hands over a storage URL plus auth token
//! (credential acquisition is deliberately outside this crate).
//!
//! Version tags ride in an object metadata header rather than the `ETag`
//! the service computes itself, so the tag scheme stays identical across
//! backends: always the client-side content digest from [`crate::hash`].
//! Objects uploaded by other tooling fall back to their `ETag`, which
//! still satisfies the "equal tags, equal bytes" contract.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use mirrorlite_types::{BlobLocation, VersionTag};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::error::StorageError;

/// Auth token request header.
const AUTH_HEADER: &str = "X-Auth-Token";

/// Object metadata header carrying the client-computed content digest.
const DIGEST_HEADER: &str = "X-Object-Meta-Mirror-Digest";

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the Swift backend.
#[derive(Debug, Clone)]
pub struct SwiftConfig {
    /// Account storage URL (e.g. `https://storage.example.net/v1/AUTH_abc`).
    pub storage_url: String,
    /// Pre-resolved auth token sent with every request.
    pub auth_token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl SwiftConfig {
    /// Create a configuration from a storage URL and auth token.
    pub fn new(storage_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            storage_url: storage_url.into(),
            auth_token: auth_token.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP client for a Swift-compatible object storage service.
#[derive(Debug, Clone)]
pub struct SwiftStore {
    client: reqwest::Client,
    storage_url: String,
    auth_token: String,
}

impl SwiftStore {
    /// Build a client from configuration.
    pub fn new(config: &SwiftConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            storage_url: config.storage_url.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn object_url(&self, location: &BlobLocation) -> String {
        format!(
            "{}/{}/{}",
            self.storage_url.trim_end_matches('/'),
            location.container,
            location.filename
        )
    }

    fn check_status(
        response: &reqwest::Response,
        url: &str,
        location: &BlobLocation,
    ) -> Result<(), StorageError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(location.to_string()));
        }
        if !status.is_success() {
            return Err(StorageError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        Ok(())
    }

    fn version_tag(response: &reqwest::Response) -> Result<VersionTag, StorageError> {
        let header = response
            .headers()
            .get(DIGEST_HEADER)
            .or_else(|| response.headers().get(reqwest::header::ETAG))
            .ok_or(StorageError::MissingVersionTag)?;
        let text = header
            .to_str()
            .map_err(|_invalid| StorageError::MissingVersionTag)?;
        Ok(VersionTag::new(text.trim_matches('"')))
    }

    /// Current version tag of the remote object.
    pub async fn head(&self, location: &BlobLocation) -> Result<VersionTag, StorageError> {
        let url = self.object_url(location);
        let response = self
            .client
            .head(&url)
            .header(AUTH_HEADER, &self.auth_token)
            .send()
            .await?;
        Self::check_status(&response, &url, location)?;
        Self::version_tag(&response)
    }

    /// Stream the remote object into `destination` and return its version
    /// tag.
    pub async fn download_to(
        &self,
        location: &BlobLocation,
        destination: &Path,
    ) -> Result<VersionTag, StorageError> {
        let url = self.object_url(location);
        let response = self
            .client
            .get(&url)
            .header(AUTH_HEADER, &self.auth_token)
            .send()
            .await?;
        Self::check_status(&response, &url, location)?;
        let tag = Self::version_tag(&response)?;

        let mut file = tokio::fs::File::create(destination).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        tracing::debug!(
            location = %location,
            destination = %destination.display(),
            "Downloaded blob"
        );
        Ok(tag)
    }

    /// Stream the file at `source` up to the remote object, tagged with
    /// the caller-computed content digest.
    pub async fn upload(
        &self,
        location: &BlobLocation,
        source: &Path,
        tag: &VersionTag,
    ) -> Result<(), StorageError> {
        let url = self.object_url(location);
        let file = tokio::fs::File::open(source).await?;
        let length = file.metadata().await?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let response = self
            .client
            .put(&url)
            .header(AUTH_HEADER, &self.auth_token)
            .header(DIGEST_HEADER, tag.as_str())
            .header(reqwest::header::CONTENT_LENGTH, length)
            .body(body)
            .send()
            .await?;
        Self::check_status(&response, &url, location)?;

        tracing::debug!(location = %location, bytes = length, "Uploaded blob");
        Ok(())
    }

    /// Delete the remote object. Fails with [`StorageError::NotFound`]
    /// when absent, which destroy paths tolerate.
    pub async fn delete(&self, location: &BlobLocation) -> Result<(), StorageError> {
        let url = self.object_url(location);
        let response = self
            .client
            .delete(&url)
            .header(AUTH_HEADER, &self.auth_token)
            .send()
            .await?;
        Self::check_status(&response, &url, location)?;
        Ok(())
    }
}
