//! Media storage on the platform's file service
//!
//! Handles upload, delete, and preview URL generation for post media.
//! Files live in a single bucket; previews are served by the platform.

use std::sync::Arc;

use url::Url;

use crate::backend::Backend;
use crate::config::MediaConfig;
use crate::data::{EntityId, MediaFile, StoredFile};
use crate::error::AppError;
use crate::metrics::{MEDIA_BYTES_UPLOADED, MEDIA_UPLOADS_TOTAL};

/// Media storage service
pub struct MediaStorage {
    backend: Arc<dyn Backend>,
    /// Bucket holding post media
    bucket_id: String,
    /// Preview transform
    preview: MediaConfig,
}

impl MediaStorage {
    pub fn new(backend: Arc<dyn Backend>, bucket_id: impl Into<String>, preview: MediaConfig) -> Self {
        Self {
            backend,
            bucket_id: bucket_id.into(),
            preview,
        }
    }

    /// Upload a media file under a fresh id
    ///
    /// # Returns
    /// Metadata of the stored file
    pub async fn upload(&self, file: MediaFile) -> Result<StoredFile, AppError> {
        let file_id = EntityId::new().0;
        let size = file.bytes.len();
        let content_type = file.content_type.clone();

        let stored = self
            .backend
            .create_file(&self.bucket_id, &file_id, file)
            .await
            .map_err(storage_error("upload"))?;

        MEDIA_UPLOADS_TOTAL.inc();
        MEDIA_BYTES_UPLOADED.inc_by(size as f64);
        tracing::debug!(
            file_id = %stored.id,
            size,
            content_type = %content_type,
            "Media uploaded"
        );

        Ok(stored)
    }

    /// Preview URL for a stored file
    pub fn preview_url(&self, file_id: &str) -> Result<Url, AppError> {
        self.backend
            .file_preview_url(&self.bucket_id, file_id, &self.preview)
    }

    /// Delete a stored file
    pub async fn delete(&self, file_id: &str) -> Result<(), AppError> {
        self.backend
            .delete_file(&self.bucket_id, file_id)
            .await
            .map_err(storage_error("delete"))?;

        tracing::debug!(file_id, "Media deleted");
        Ok(())
    }

    /// Delete a file whose owner operation failed
    ///
    /// Failures are logged and swallowed; the caller reports its own error.
    pub async fn discard(&self, file_id: &str) {
        if let Err(e) = self.delete(file_id).await {
            tracing::error!(file_id, error = %e, "Failed to delete orphaned media");
        }
    }
}

/// Keep absence and transport errors, wrap platform rejections as storage errors
fn storage_error(action: &'static str) -> impl Fn(AppError) -> AppError {
    move |e| match e {
        AppError::NotFound | AppError::Unauthorized | AppError::HttpClient(_) => e,
        other => AppError::Storage(format!("media {} failed: {}", action, other)),
    }
}
