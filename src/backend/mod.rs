//! Hosted platform access
//!
//! [`Backend`] is the fixed request interface to the external document,
//! account and file services. [`HttpBackend`] speaks the platform's REST
//! API; tests substitute a mock or an in-memory fake.

mod http;
mod query;

pub use http::HttpBackend;
pub use query::Query;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::config::MediaConfig;
use crate::data::{Account, DocumentList, MediaFile, Session, StoredFile};
use crate::error::AppError;

/// Session id addressing the caller's own session
pub const CURRENT_SESSION: &str = "current";

/// Request interface of the hosted platform
///
/// Documents are exchanged as raw JSON records; typed conversion happens
/// in the gateway. Missing records and missing sessions surface as
/// [`AppError::NotFound`] and [`AppError::Unauthorized`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    // Documents

    async fn create_document(
        &self,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Value, AppError>;

    async fn get_document(&self, collection_id: &str, document_id: &str)
    -> Result<Value, AppError>;

    /// Partial update: only the attributes present in `data` change
    async fn update_document(
        &self,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Value, AppError>;

    async fn delete_document(&self, collection_id: &str, document_id: &str)
    -> Result<(), AppError>;

    async fn list_documents(
        &self,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<DocumentList<Value>, AppError>;

    // Account

    async fn create_account(
        &self,
        account_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account, AppError>;

    async fn create_email_password_session(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError>;

    async fn delete_session(&self, session_id: &str) -> Result<(), AppError>;

    /// Account owning the current session
    async fn get_account(&self) -> Result<Account, AppError>;

    // Storage

    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        file: MediaFile,
    ) -> Result<StoredFile, AppError>;

    /// Preview URL of a stored file; no request is made
    fn file_preview_url(
        &self,
        bucket_id: &str,
        file_id: &str,
        preview: &MediaConfig,
    ) -> Result<Url, AppError>;

    async fn delete_file(&self, bucket_id: &str, file_id: &str) -> Result<(), AppError>;

    /// Initials avatar URL for `name`; no request is made
    fn initials_avatar_url(&self, name: &str) -> Result<Url, AppError>;
}
