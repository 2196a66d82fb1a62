//! Optimistic like and save toggles
//!
//! A [`PostStats`] holds the locally rendered like set and saved flag of
//! one post. Toggles update local state first and run the mutation on a
//! spawned task. There is no rollback: a failed mutation is logged by the
//! mutation layer and surfaces on the returned task handle. Local state
//! converges at the next current-user refetch triggered by invalidation.

use tokio::task::JoinHandle;

use crate::data::{Post, User};
use crate::error::AppError;
use crate::queries::Queries;

/// Like set after `user_id` toggles their like
///
/// Removes every occurrence of `user_id` if present, appends it otherwise.
pub fn toggle_like_set(likes: &[String], user_id: &str) -> Vec<String> {
    if likes.iter().any(|id| id == user_id) {
        likes.iter().filter(|id| *id != user_id).cloned().collect()
    } else {
        let mut next = likes.to_vec();
        next.push(user_id.to_string());
        next
    }
}

/// Local like/save state of one rendered post
pub struct PostStats {
    queries: Queries,
    post_id: String,
    user_id: String,
    likes: Vec<String>,
    is_saved: bool,
}

impl PostStats {
    /// State for `post` as seen by `user_id`
    ///
    /// The saved flag starts from the cached current-user snapshot, if any.
    pub fn new(queries: Queries, post: &Post, user_id: impl Into<String>) -> Self {
        let mut stats = Self {
            post_id: post.id.clone(),
            user_id: user_id.into(),
            likes: post.likes.clone(),
            is_saved: false,
            queries,
        };
        if let Some(user) = stats.queries.cached_current_user() {
            stats.sync_with_user(&user);
        }
        stats
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn likes(&self) -> &[String] {
        &self.likes
    }

    pub fn is_liked(&self) -> bool {
        self.likes.iter().any(|id| *id == self.user_id)
    }

    pub fn is_saved(&self) -> bool {
        self.is_saved
    }

    /// Re-derive the saved flag from a fresh user snapshot
    pub fn sync_with_user(&mut self, user: &User) {
        self.is_saved = user.saved_record_for(&self.post_id).is_some();
    }

    /// Toggle the acting user's like
    ///
    /// Returns the new like set immediately, along with the handle of the
    /// spawned mutation carrying the full set.
    pub fn toggle_like(&mut self) -> (Vec<String>, JoinHandle<Result<Post, AppError>>) {
        self.likes = toggle_like_set(&self.likes, &self.user_id);

        let queries = self.queries.clone();
        let post_id = self.post_id.clone();
        let likes = self.likes.clone();
        let task = tokio::spawn(async move { queries.like_post(&post_id, likes).await });

        (self.likes.clone(), task)
    }

    /// Toggle the saved flag
    ///
    /// The save record is looked up in the cached current-user snapshot:
    /// present means unsave (delete that record), absent means save.
    pub fn toggle_save(&mut self) -> JoinHandle<Result<(), AppError>> {
        let record_id = self
            .queries
            .cached_current_user()
            .and_then(|user| user.saved_record_for(&self.post_id).map(|r| r.id.clone()));

        let queries = self.queries.clone();
        let post_id = self.post_id.clone();
        let user_id = self.user_id.clone();

        match record_id {
            Some(record_id) => {
                self.is_saved = false;
                tracing::debug!(post_id = %post_id, record_id = %record_id, "Unsaving post");
                tokio::spawn(async move { queries.delete_saved_post(&record_id).await })
            }
            None => {
                self.is_saved = true;
                tracing::debug!(post_id = %post_id, "Saving post");
                tokio::spawn(async move { queries.save_post(&user_id, &post_id).await.map(|_| ()) })
            }
        }
    }
}
