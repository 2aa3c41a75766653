//! Image storage for menu item photos.
//!
//! Uploads are stored under a per-organization prefix and served back as
//! absolute URLs. The trait keeps handlers independent of the backing
//! store; the default implementation writes to the local filesystem and
//! serves files via the `/uploads` static route.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use stallfront_core::OrganizationId;

/// Content types accepted for menu item images.
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Errors from the image store.
#[derive(Debug, Error)]
pub enum ImageStoreError {
    /// The upload's content type is not an accepted image format.
    #[error("invalid content type: {0}")]
    InvalidContentType(String),

    /// Filesystem failure while persisting the upload.
    #[error("image storage failed")]
    Io(#[from] std::io::Error),
}

/// Persists uploaded images and returns a publicly reachable URL.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store image bytes for an organization and return their URL.
    async fn put(
        &self,
        organization_id: OrganizationId,
        content_type: &str,
        data: &[u8],
    ) -> Result<String, ImageStoreError>;
}

/// Filesystem-backed image store.
///
/// Keys are `{org_id}/{uuid}.{ext}` under the configured upload directory,
/// which the server exposes at `{base_url}/uploads/`.
pub struct LocalImageStore {
    root: PathBuf,
    base_url: String,
}

impl LocalImageStore {
    #[must_use]
    pub fn new(root: PathBuf, base_url: &str) -> Self {
        Self {
            root,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn put(
        &self,
        organization_id: OrganizationId,
        content_type: &str,
        data: &[u8],
    ) -> Result<String, ImageStoreError> {
        let extension = extension_for(content_type)
            .ok_or_else(|| ImageStoreError::InvalidContentType(content_type.to_owned()))?;

        let key = format!("{organization_id}/{}.{extension}", Uuid::new_v4());

        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;

        tracing::debug!(key = %key, bytes = data.len(), "stored image");

        Ok(format!("{}/uploads/{key}", self.base_url))
    }
}

/// Map an accepted content type to its file extension.
fn extension_for(content_type: &str) -> Option<&'static str> {
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return None;
    }
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}
