//! Blob storage for payloads too large to keep inline in a record.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Opaque reference to a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(String);

impl BlobRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("invalid blob reference: {0}")]
    InvalidRef(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn store(&self, bytes: Bytes, content_type: &str) -> Result<BlobRef, BlobError>;

    /// Public URL of the blob, or `None` when it does not exist.
    async fn url(&self, blob: &BlobRef) -> Result<Option<String>, BlobError>;

    /// Deleting a missing blob succeeds.
    async fn delete(&self, blob: &BlobRef) -> Result<(), BlobError>;
}

pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "text/html" => "html",
        "text/plain" => "txt",
        _ => "bin",
    }
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Blobs kept as files in one directory and served under `/storage/`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn path_of(&self, blob: &BlobRef) -> Result<PathBuf, BlobError> {
        if !is_safe_name(blob.as_str()) {
            return Err(BlobError::InvalidRef(blob.to_string()));
        }
        Ok(self.root.join(blob.as_str()))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, bytes: Bytes, content_type: &str) -> Result<BlobRef, BlobError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let blob = BlobRef::new(format!("{}.{}", Uuid::new_v4(), extension_for(content_type)));
        tokio::fs::write(self.root.join(blob.as_str()), &bytes).await?;

        tracing::debug!(blob = %blob, size = bytes.len(), content_type, "blob stored");
        Ok(blob)
    }

    async fn url(&self, blob: &BlobRef) -> Result<Option<String>, BlobError> {
        let path = self.path_of(blob)?;
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        Ok(Some(format!("{}/storage/{}", self.public_base_url, blob)))
    }

    async fn delete(&self, blob: &BlobRef) -> Result<(), BlobError> {
        let path = self.path_of(blob)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(blob = %blob, "blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub use memory::MemoryBlobStore;
