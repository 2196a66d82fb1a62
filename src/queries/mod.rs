//! Cached reads and tracked mutations
//!
//! Views never call the gateway directly. Every read goes through the
//! query cache under its operation key; every write goes through a
//! mutation that invalidates the keys depending on it.

mod mutations;

use std::sync::Arc;

use futures::FutureExt;

use crate::data::{
    InfiniteData, MutationKind, MutationStatus, MutationTracker, PageFetcher, Post, QueryClient,
    QueryKey, QueryState, SavedPost, User,
};
use crate::error::AppError;
use crate::gateway::Gateway;

/// Read and mutation entry points shared by every view
///
/// Cheap to clone; clones share the cache and mutation state.
#[derive(Clone)]
pub struct Queries {
    gateway: Arc<Gateway>,
    client: QueryClient,
    mutations: Arc<MutationTracker>,
}

impl Queries {
    pub fn new(gateway: Arc<Gateway>, client: QueryClient) -> Self {
        Self {
            gateway,
            client,
            mutations: Arc::new(MutationTracker::new()),
        }
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub fn mutation_status(&self, kind: MutationKind) -> MutationStatus {
        self.mutations.status(kind)
    }

    /// Cached current-user snapshot, if one was fetched
    pub fn cached_current_user(&self) -> Option<Arc<User>> {
        self.client
            .get_query_data::<Option<User>>(&QueryKey::current_user())
            .and_then(|user| (*user).clone())
            .map(Arc::new)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// `None` inside `data` means no session
    pub async fn current_user(&self) -> QueryState<Option<User>> {
        let gateway = self.gateway.clone();
        self.client
            .query(QueryKey::current_user(), move || async move {
                gateway.get_current_user().await
            })
            .await
    }

    pub async fn recent_posts(&self) -> QueryState<Vec<Post>> {
        let gateway = self.gateway.clone();
        self.client
            .query(QueryKey::recent_posts(), move || async move {
                gateway.get_recent_posts().await
            })
            .await
    }

    /// Disabled while `post_id` is empty
    pub async fn post_by_id(&self, post_id: &str) -> QueryState<Option<Post>> {
        if post_id.is_empty() {
            return QueryState::idle();
        }

        let gateway = self.gateway.clone();
        let id = post_id.to_string();
        self.client
            .query(QueryKey::post_by_id(post_id), move || async move {
                gateway.get_post_by_id(&id).await
            })
            .await
    }

    /// Disabled while `term` is empty
    pub async fn search_posts(&self, term: &str) -> QueryState<Vec<Post>> {
        if term.is_empty() {
            return QueryState::idle();
        }

        let gateway = self.gateway.clone();
        let term_owned = term.to_string();
        self.client
            .query(QueryKey::search_posts(term), move || async move {
                gateway.search_posts(&term_owned).await
            })
            .await
    }

    /// Disabled while `user_id` is empty
    pub async fn saved_posts(&self, user_id: &str) -> QueryState<Vec<SavedPost>> {
        if user_id.is_empty() {
            return QueryState::idle();
        }

        let gateway = self.gateway.clone();
        let id = user_id.to_string();
        self.client
            .query(QueryKey::saved_posts(user_id), move || async move {
                gateway.get_saved_posts(&id).await
            })
            .await
    }

    pub async fn users(&self, limit: Option<usize>) -> QueryState<Vec<User>> {
        let gateway = self.gateway.clone();
        self.client
            .query(QueryKey::users(), move || async move {
                gateway.get_users(limit).await
            })
            .await
    }

    /// Disabled while `user_id` is empty
    pub async fn user_by_id(&self, user_id: &str) -> QueryState<Option<User>> {
        if user_id.is_empty() {
            return QueryState::idle();
        }

        let gateway = self.gateway.clone();
        let id = user_id.to_string();
        self.client
            .query(QueryKey::user_by_id(user_id), move || async move {
                gateway.get_user_by_id(&id).await
            })
            .await
    }

    /// Explore list, first page on first read
    pub async fn posts(&self) -> QueryState<InfiniteData<Post>> {
        self.client
            .infinite_query(QueryKey::infinite_posts(), self.post_pages())
            .await
    }

    /// Append the next explore page; no-op once the list is exhausted
    pub async fn fetch_next_posts_page(&self) -> Result<Arc<InfiniteData<Post>>, Arc<AppError>> {
        self.client
            .fetch_next_page(QueryKey::infinite_posts(), self.post_pages())
            .await
    }

    fn post_pages(&self) -> PageFetcher<Post> {
        let gateway = self.gateway.clone();
        Arc::new(move |cursor: Option<String>| {
            let gateway = gateway.clone();
            async move { gateway.get_infinite_posts(cursor.as_deref()).await }.boxed()
        })
    }
}
