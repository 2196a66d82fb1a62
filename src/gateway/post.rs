//! Post operations
//!
//! Writes that involve media upload the file first and delete it again
//! when a later step fails. Rollback is best-effort and never masks the
//! original error.

use serde_json::{Value, json};
use url::Url;

use super::documents::{PostDocument, decode};
use super::{Gateway, optional, parse_tags, require};
use crate::backend::Query;
use crate::data::{EntityId, MediaFile, NewPost, Post, StoredFile, UpdatePost};
use crate::error::AppError;

impl Gateway {
    pub async fn upload_file(&self, file: MediaFile) -> Result<StoredFile, AppError> {
        self.media.upload(file).await
    }

    pub fn get_file_preview(&self, file_id: &str) -> Result<Url, AppError> {
        require("file id", file_id)?;
        self.media.preview_url(file_id)
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<(), AppError> {
        require("file id", file_id)?;
        self.media.delete(file_id).await
    }

    /// Upload a file and derive its preview URL, deleting the file again
    /// if no preview URL can be produced
    async fn upload_with_preview(&self, file: MediaFile) -> Result<(String, Url), AppError> {
        let stored = self.media.upload(file).await?;
        match self.media.preview_url(&stored.id) {
            Ok(url) => Ok((stored.id, url)),
            Err(e) => {
                self.media.discard(&stored.id).await;
                Err(e)
            }
        }
    }

    /// Upload the media and create the post document
    pub async fn create_post(&self, post: NewPost) -> Result<Post, AppError> {
        require("user id", &post.user_id)?;
        post.validate()?;

        let NewPost {
            user_id,
            caption,
            location,
            tags,
            file,
        } = post;
        let (file_id, image_url) = self.upload_with_preview(file).await?;

        let created = self
            .backend
            .create_document(
                &self.collections.posts,
                &EntityId::new().0,
                json!({
                    "creator": user_id,
                    "caption": caption,
                    "imageUrl": image_url.as_str(),
                    "imageId": file_id,
                    "tags": parse_tags(&tags),
                    "location": location,
                }),
            )
            .await
            .and_then(|value| decode::<PostDocument, Post>("post", value));

        match created {
            Ok(post) => {
                tracing::info!(post_id = %post.id, file_id = %post.image_id, "Post created");
                Ok(post)
            }
            Err(e) => {
                tracing::warn!(error = %e, file_id = %file_id, "Post creation failed; removing upload");
                self.media.discard(&file_id).await;
                Err(e)
            }
        }
    }

    /// Update caption, location and tags, optionally replacing the media
    ///
    /// A replacement file is uploaded first. If the document update fails
    /// the new file is deleted; if it succeeds the replaced file is.
    pub async fn update_post(&self, post: UpdatePost) -> Result<Post, AppError> {
        require("post id", &post.post_id)?;
        post.validate()?;

        let UpdatePost {
            post_id,
            caption,
            location,
            tags,
            image_id,
            image_url,
            file,
        } = post;

        let replacement = match file {
            Some(file) => Some(self.upload_with_preview(file).await?),
            None => None,
        };
        let (new_image_id, new_image_url) = match &replacement {
            Some((file_id, url)) => (file_id.clone(), url.to_string()),
            None => (image_id.clone(), image_url),
        };

        let updated = self
            .backend
            .update_document(
                &self.collections.posts,
                &post_id,
                json!({
                    "caption": caption,
                    "location": location,
                    "tags": parse_tags(&tags),
                    "imageUrl": new_image_url,
                    "imageId": new_image_id,
                }),
            )
            .await
            .and_then(|value| decode::<PostDocument, Post>("post", value));

        match (updated, replacement) {
            (Ok(post), Some(_)) => {
                if !image_id.is_empty() {
                    if let Err(e) = self.media.delete(&image_id).await {
                        tracing::warn!(file_id = %image_id, error = %e, "Failed to delete replaced media");
                    }
                }
                tracing::info!(post_id = %post.id, "Post updated with new media");
                Ok(post)
            }
            (Ok(post), None) => {
                tracing::info!(post_id = %post.id, "Post updated");
                Ok(post)
            }
            (Err(e), Some((file_id, _))) => {
                tracing::warn!(post_id = %post_id, error = %e, "Post update failed; removing upload");
                self.media.discard(&file_id).await;
                Err(e)
            }
            (Err(e), None) => Err(e),
        }
    }

    /// Delete the post document, then its media
    ///
    /// Both ids are required; nothing is deleted if either is missing.
    /// Once the document is gone a media deletion failure is only logged.
    pub async fn delete_post(&self, post_id: &str, image_id: &str) -> Result<(), AppError> {
        require("post id", post_id)?;
        require("image id", image_id)?;

        self.backend
            .delete_document(&self.collections.posts, post_id)
            .await?;
        self.media.discard(image_id).await;

        tracing::info!(post_id, "Post deleted");
        Ok(())
    }

    pub async fn get_post_by_id(&self, post_id: &str) -> Result<Option<Post>, AppError> {
        require("post id", post_id)?;

        optional(
            self.backend
                .get_document(&self.collections.posts, post_id)
                .await,
        )?
        .map(|value| decode::<PostDocument, _>("post", value))
        .transpose()
    }

    /// Newest posts for the home feed
    ///
    /// Sorted by creation time descending, not ascending, so a post that was
    /// just created is on the first screen of the feed.
    pub async fn get_recent_posts(&self) -> Result<Vec<Post>, AppError> {
        self.list_posts(&[
            Query::order_desc("$createdAt"),
            Query::limit(self.limits.recent_posts_limit),
        ])
        .await
    }

    /// One page of the explore list, most recently updated first
    pub async fn get_infinite_posts(&self, cursor: Option<&str>) -> Result<Vec<Post>, AppError> {
        let mut queries = vec![
            Query::order_desc("$updatedAt"),
            Query::limit(self.limits.page_size),
        ];
        if let Some(cursor) = cursor.filter(|cursor| !cursor.is_empty()) {
            queries.push(Query::cursor_after(cursor));
        }

        self.list_posts(&queries).await
    }

    /// Full-text search over captions
    pub async fn search_posts(&self, term: &str) -> Result<Vec<Post>, AppError> {
        self.list_posts(&[Query::search("caption", term)]).await
    }

    /// Replace the post's like list with `likes`
    pub async fn like_post(&self, post_id: &str, likes: &[String]) -> Result<Post, AppError> {
        require("post id", post_id)?;

        let value = self
            .backend
            .update_document(
                &self.collections.posts,
                post_id,
                json!({ "likes": likes }),
            )
            .await?;

        decode::<PostDocument, _>("post", value)
    }

    async fn list_posts(&self, queries: &[Query]) -> Result<Vec<Post>, AppError> {
        let list = self
            .backend
            .list_documents(&self.collections.posts, queries)
            .await?;
        decode_posts(list.documents)
    }
}

fn decode_posts(documents: Vec<Value>) -> Result<Vec<Post>, AppError> {
    documents
        .into_iter()
        .map(|value| decode::<PostDocument, _>("post", value))
        .collect()
}
