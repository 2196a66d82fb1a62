//! Persisted session-fallback cookie
//!
//! When cookies cannot be used the platform hands its session cookie back
//! in the `X-Fallback-Cookies` header. The last value is kept in a single
//! file so the next launch can send it again. The literal `[]` is the
//! platform's "no session" value.

use std::path::PathBuf;

use crate::error::AppError;

/// Value stored once the session is gone
pub const SIGNED_OUT: &str = "[]";

/// File-backed store for the fallback cookie
#[derive(Debug, Clone)]
pub struct SessionFallback {
    path: PathBuf,
}

impl SessionFallback {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Last stored value, `None` if nothing was ever stored
    pub async fn load(&self) -> Result<Option<String>, AppError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(value) => Ok(Some(value.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Internal(e.into())),
        }
    }

    pub async fn store(&self, value: &str) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::Internal(e.into()))?;
            }
        }

        tokio::fs::write(&self.path, value)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        tracing::trace!(path = %self.path.display(), "Stored session fallback");
        Ok(())
    }

    pub async fn mark_signed_out(&self) -> Result<(), AppError> {
        self.store(SIGNED_OUT).await
    }

    /// Whether the stored value says there is no session
    ///
    /// A missing file is not a sign-out: the session may still be valid.
    pub async fn is_signed_out(&self) -> Result<bool, AppError> {
        Ok(self.load().await?.as_deref() == Some(SIGNED_OUT))
    }
}
