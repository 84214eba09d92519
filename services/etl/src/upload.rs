//! Object-store upload of the exported artifact
//!
//! Upload is best-effort: failures are logged and never change the
//! persisted-record counts.
//!
//! Backends:
//! - `FsObjectStore`: copies into `<root>/<bucket>/<key>` (MinIO-style layout on disk)
//! - `HttpObjectStore`: PUT to `<endpoint>/<bucket>/<key>` with a bearer token

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("object store credentials not available")]
    NoCredentials,

    #[error("upload failed: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadReceipt {
    pub location: String,
    pub content_hash: String,
    pub size_bytes: u64,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, local: &Path, bucket: &str, key: &str) -> Result<UploadReceipt, UploadError>;
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}

async fn read_artifact(local: &Path) -> Result<Vec<u8>, UploadError> {
    fs::read(local).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => UploadError::NotFound(local.to_path_buf()),
        _ => UploadError::Other(e.to_string()),
    })
}

/// Keys are relative paths made of plain segments
fn check_key(bucket: &str, key: &str) -> Result<(), UploadError> {
    let plain = |s: &str| {
        !s.is_empty()
            && Path::new(s)
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
    };
    if !plain(bucket) || bucket.contains('/') {
        return Err(UploadError::Other(format!("invalid bucket '{}'", bucket)));
    }
    if !plain(key) {
        return Err(UploadError::Other(format!("invalid object key '{}'", key)));
    }
    Ok(())
}

// =============================================================================
// Filesystem
// =============================================================================

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn upload(&self, local: &Path, bucket: &str, key: &str) -> Result<UploadReceipt, UploadError> {
        check_key(bucket, key)?;
        let bytes = read_artifact(local).await?;

        let dest = self.root.join(bucket).join(key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| UploadError::Other(e.to_string()))?;
        }
        fs::write(&dest, &bytes)
            .await
            .map_err(|e| UploadError::Other(e.to_string()))?;

        Ok(UploadReceipt {
            location: dest.to_string_lossy().to_string(),
            content_hash: content_hash(&bytes),
            size_bytes: bytes.len() as u64,
        })
    }
}

// =============================================================================
// HTTP (S3-compatible PUT)
// =============================================================================

pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(client: reqwest::Client, endpoint: &str, token: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn upload(&self, local: &Path, bucket: &str, key: &str) -> Result<UploadReceipt, UploadError> {
        check_key(bucket, key)?;
        let bytes = read_artifact(local).await?;
        let token = self.token.as_deref().ok_or(UploadError::NoCredentials)?;

        let url = format!("{}/{}/{}", self.endpoint, bucket, key);
        let hash = content_hash(&bytes);
        let size_bytes = bytes.len() as u64;

        let resp = self
            .client
            .put(&url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .header("x-amz-meta-sha256", hash.trim_start_matches("sha256:"))
            .body(bytes)
            .send()
            .await
            .map_err(|e| UploadError::Other(e.to_string()))?;

        match resp.status() {
            s if s.is_success() => Ok(UploadReceipt {
                location: url,
                content_hash: hash,
                size_bytes,
            }),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Err(UploadError::NoCredentials)
            }
            s => Err(UploadError::Other(format!("HTTP {}", s))),
        }
    }
}

/// Upload and log the outcome; never fails the caller
pub async fn upload_best_effort(
    store: &dyn ObjectStore,
    local: &Path,
    bucket: &str,
    key: &str,
) -> Option<UploadReceipt> {
    match store.upload(local, bucket, key).await {
        Ok(receipt) => {
            info!(
                "File uploaded: {} ({} bytes, {})",
                receipt.location, receipt.size_bytes, receipt.content_hash
            );
            Some(receipt)
        }
        Err(UploadError::NotFound(path)) => {
            warn!("Upload skipped, file not found: {}", path.display());
            None
        }
        Err(UploadError::NoCredentials) => {
            warn!("Upload skipped, object store credentials not available");
            None
        }
        Err(e) => {
            error!("Failed to upload {} to {}/{}: {}", local.display(), bucket, key, e);
            None
        }
    }
}
