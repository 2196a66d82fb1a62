//! Mutations
//!
//! Each mutation runs its gateway operation, then marks its dependent
//! keys stale. Failures leave the cache untouched.

use std::future::Future;

use super::Queries;
use crate::data::{
    MutationKind, NewPost, NewUser, Post, QueryKey, SavedPostRecord, Session, SignInCredentials,
    UpdatePost, User,
};
use crate::error::AppError;
use crate::metrics::MUTATIONS_TOTAL;

impl Queries {
    async fn mutate<T, Fut>(
        &self,
        kind: MutationKind,
        post_id: Option<&str>,
        operation: Fut,
    ) -> Result<T, AppError>
    where
        Fut: Future<Output = Result<T, AppError>>,
    {
        self.mutations.begin(kind);
        let result = operation.await;
        self.mutations.finish(kind, result.is_ok());

        match &result {
            Ok(_) => {
                MUTATIONS_TOTAL
                    .with_label_values(&[kind.as_str(), "success"])
                    .inc();
                for key in kind.dependent_keys(post_id) {
                    self.client.invalidate(&key);
                }
            }
            Err(e) => {
                MUTATIONS_TOTAL
                    .with_label_values(&[kind.as_str(), "error"])
                    .inc();
                e.record();
                tracing::warn!(mutation = kind.as_str(), error = %e, "Mutation failed");
            }
        }

        result
    }

    pub async fn create_user_account(&self, user: NewUser) -> Result<User, AppError> {
        self.mutate(
            MutationKind::CreateUserAccount,
            None,
            self.gateway.create_user_account(&user),
        )
        .await
    }

    pub async fn sign_in_account(
        &self,
        credentials: SignInCredentials,
    ) -> Result<Session, AppError> {
        self.mutate(
            MutationKind::SignInAccount,
            None,
            self.gateway.sign_in_account(&credentials),
        )
        .await
    }

    /// Delete the current session and forget everything cached for it
    ///
    /// The current user reads as "no session" afterwards without a round
    /// trip.
    pub async fn sign_out_account(&self) -> Result<(), AppError> {
        self.mutate(
            MutationKind::SignOutAccount,
            None,
            self.gateway.sign_out_account(),
        )
        .await?;
        self.client.clear();
        self.client.set_query_data(QueryKey::current_user(), None::<User>);
        Ok(())
    }

    pub async fn create_post(&self, post: NewPost) -> Result<Post, AppError> {
        self.mutate(MutationKind::CreatePost, None, self.gateway.create_post(post))
            .await
    }

    pub async fn update_post(&self, post: UpdatePost) -> Result<Post, AppError> {
        let post_id = post.post_id.clone();
        self.mutate(
            MutationKind::UpdatePost,
            Some(&post_id),
            self.gateway.update_post(post),
        )
        .await
    }

    pub async fn delete_post(&self, post_id: &str, image_id: &str) -> Result<(), AppError> {
        self.mutate(
            MutationKind::DeletePost,
            Some(post_id),
            self.gateway.delete_post(post_id, image_id),
        )
        .await
    }

    /// Replace the post's like list with `likes`
    pub async fn like_post(&self, post_id: &str, likes: Vec<String>) -> Result<Post, AppError> {
        self.mutate(
            MutationKind::LikePost,
            Some(post_id),
            self.gateway.like_post(post_id, &likes),
        )
        .await
    }

    pub async fn save_post(&self, user_id: &str, post_id: &str) -> Result<SavedPostRecord, AppError> {
        self.mutate(
            MutationKind::SavePost,
            Some(post_id),
            self.gateway.save_post(user_id, post_id),
        )
        .await
    }

    pub async fn delete_saved_post(&self, record_id: &str) -> Result<(), AppError> {
        self.mutate(
            MutationKind::DeleteSavedPost,
            None,
            self.gateway.delete_saved_post(record_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::queries_with_stale_time;
    use super::Queries;
    use crate::backend::MockBackend;
    use crate::data::{MutationKind, MutationStatus, QueryKey, User};
    use crate::error::AppError;
    use std::time::Duration;

    fn long_lived(backend: MockBackend) -> Queries {
        queries_with_stale_time(backend, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn successful_like_invalidates_dependents() {
        let mut backend = MockBackend::new();
        backend.expect_update_document().returning(|_, id, _| {
            Ok(serde_json::json!({
                "$id": id,
                "$createdAt": "2024-05-01T10:00:00.000+00:00",
                "$updatedAt": "2024-05-01T10:00:00.000+00:00",
                "caption": "Blue sky today",
                "imageUrl": "https://cdn/p1",
                "imageId": "f1",
                "likes": ["u1"]
            }))
        });
        let queries = long_lived(backend);
        let client = queries.client();
        client.set_query_data(QueryKey::post_by_id("p1"), 1u8);
        client.set_query_data(QueryKey::post_by_id("p2"), 2u8);
        client.set_query_data(QueryKey::current_user(), 3u8);

        queries.like_post("p1", vec!["u1".to_string()]).await.unwrap();

        assert!(client.peek::<u8>(&QueryKey::post_by_id("p1")).is_stale);
        assert!(!client.peek::<u8>(&QueryKey::post_by_id("p2")).is_stale);
        assert!(client.peek::<u8>(&QueryKey::current_user()).is_stale);
        assert_eq!(
            queries.mutation_status(MutationKind::LikePost),
            MutationStatus::Success
        );
    }

    #[tokio::test]
    async fn sign_out_forgets_cached_user() {
        let mut backend = MockBackend::new();
        backend.expect_delete_session().times(1).returning(|_| Ok(()));
        backend.expect_get_account().never();
        let queries = long_lived(backend);
        let client = queries.client();
        client.set_query_data(QueryKey::saved_posts("u1"), 1u8);
        client.set_query_data(
            QueryKey::current_user(),
            Some(User {
                id: "u1".to_string(),
                account_id: "a1".to_string(),
                name: "Ann".to_string(),
                username: "ann1".to_string(),
                email: "ann@x.com".to_string(),
                image_url: "https://cdn/avatar".to_string(),
                bio: None,
                saves: Vec::new(),
                liked: Vec::new(),
            }),
        );

        queries.sign_out_account().await.unwrap();

        assert!(queries.cached_current_user().is_none());
        assert!(client.peek::<u8>(&QueryKey::saved_posts("u1")).data.is_none());
        let state = queries.current_user().await;
        assert_eq!(state.data.as_deref(), Some(&None));
        assert!(!state.is_fetching);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_cache_fresh() {
        let mut backend = MockBackend::new();
        backend
            .expect_delete_document()
            .returning(|_, _| Err(AppError::Forbidden));
        let queries = long_lived(backend);
        let client = queries.client();
        client.set_query_data(QueryKey::recent_posts(), 1u8);

        let error = queries.delete_saved_post("s1").await.unwrap_err();
        assert!(matches!(error, AppError::Forbidden));
        assert!(!client.peek::<u8>(&QueryKey::recent_posts()).is_stale);
        assert!(queries.mutation_status(MutationKind::DeleteSavedPost).is_error());
    }
}
