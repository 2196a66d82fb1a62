//! Saved-post records

use serde_json::json;

use super::documents::{SaveDocument, decode};
use super::{Gateway, require};
use crate::backend::Query;
use crate::data::{EntityId, SavedPost, SavedPostRecord};
use crate::error::AppError;

impl Gateway {
    /// Bookmark `post_id` for `user_id`
    pub async fn save_post(&self, user_id: &str, post_id: &str) -> Result<SavedPostRecord, AppError> {
        require("user id", user_id)?;
        require("post id", post_id)?;

        let value = self
            .backend
            .create_document(
                &self.collections.saves,
                &EntityId::new().0,
                json!({ "user": user_id, "post": post_id }),
            )
            .await?;

        let record: SavedPostRecord = decode::<SaveDocument, _>("save", value)?;
        tracing::debug!(record_id = %record.id, post_id, "Post saved");
        Ok(record)
    }

    pub async fn delete_saved_post(&self, record_id: &str) -> Result<(), AppError> {
        require("saved record id", record_id)?;

        self.backend
            .delete_document(&self.collections.saves, record_id)
            .await?;
        tracing::debug!(record_id, "Saved post removed");
        Ok(())
    }

    /// Posts bookmarked by `user_id`, newest bookmark first
    ///
    /// Records whose post no longer exists are skipped.
    pub async fn get_saved_posts(&self, user_id: &str) -> Result<Vec<SavedPost>, AppError> {
        require("user id", user_id)?;

        let list = self
            .backend
            .list_documents(
                &self.collections.saves,
                &[Query::equal("user", user_id), Query::order_desc("$createdAt")],
            )
            .await?;

        let mut saved = Vec::with_capacity(list.documents.len());
        for value in list.documents {
            let document: SaveDocument = serde_json::from_value(value)
                .map_err(|e| AppError::Schema(format!("save record: {}", e)))?;
            if document.post.is_none() {
                tracing::debug!(record_id = %document.id, "Skipping save of deleted post");
                continue;
            }
            saved.push(SavedPost::try_from(document)?);
        }
        Ok(saved)
    }
}
