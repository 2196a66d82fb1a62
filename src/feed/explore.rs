//! Explore page state
//!
//! Either search results for the debounced search term or the infinite
//! explore list. The list grows only while its end marker is visible and
//! no search term is typed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::debounce::{Debounced, debounce};
use crate::data::{InfiniteData, Post};
use crate::error::AppError;
use crate::queries::Queries;

/// What the explore page shows
#[derive(Debug, Clone)]
pub enum ExploreView {
    /// First explore page not loaded yet
    Loading,
    /// Search typed but not settled, or its first results are being fetched
    Searching,
    SearchResults(Arc<Vec<Post>>),
    NoResults,
    Posts(Arc<InfiniteData<Post>>),
    /// Every loaded explore page is empty
    EndOfPosts,
    Failed(Arc<AppError>),
}

pub struct ExploreFeed {
    queries: Queries,
    search_input: watch::Sender<String>,
    search: Debounced<String>,
}

impl ExploreFeed {
    pub fn new(queries: Queries, search_debounce: Duration) -> Self {
        let (search_input, search) = debounce(String::new(), search_debounce);
        Self {
            queries,
            search_input,
            search,
        }
    }

    /// Record a keystroke in the search box
    pub fn set_search(&self, term: impl Into<String>) {
        self.search_input.send_replace(term.into());
    }

    /// Raw search box content
    pub fn search_value(&self) -> String {
        self.search_input.borrow().clone()
    }

    /// Wait until the search term settles and return it
    pub async fn next_search(&mut self) -> Option<String> {
        self.search.next().await
    }

    /// The end-of-list marker became visible or hidden
    ///
    /// Fetches the next page when visible and no search is typed. The
    /// request is not cancelled if the marker goes away again.
    pub async fn on_visibility(
        &self,
        in_view: bool,
    ) -> Option<Result<Arc<InfiniteData<Post>>, Arc<AppError>>> {
        if !in_view || !self.search_value().is_empty() {
            return None;
        }
        Some(self.queries.fetch_next_posts_page().await)
    }

    pub async fn view(&self) -> ExploreView {
        if !self.search_value().is_empty() {
            return self.search_view().await;
        }

        let state = self.queries.posts().await;
        match state.data {
            Some(data) if data.all_pages_empty() => ExploreView::EndOfPosts,
            Some(data) => ExploreView::Posts(data),
            None => match state.error {
                Some(error) => ExploreView::Failed(error),
                None => ExploreView::Loading,
            },
        }
    }

    async fn search_view(&self) -> ExploreView {
        let term = self.search.current();
        if term.is_empty() {
            return ExploreView::Searching;
        }

        // A background refresh keeps showing the cached results.
        let state = self.queries.search_posts(term).await;
        if state.is_loading {
            return ExploreView::Searching;
        }
        match (state.data, state.error) {
            (Some(posts), _) if !posts.is_empty() => ExploreView::SearchResults(posts),
            (Some(_), _) => ExploreView::NoResults,
            (None, Some(error)) => ExploreView::Failed(error),
            (None, None) => ExploreView::Searching,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, Query};
    use crate::data::DocumentList;
    use crate::queries::tests::queries;

    fn post_record(id: &str) -> serde_json::Value {
        serde_json::json!({
            "$id": id,
            "$createdAt": "2024-05-01T10:00:00.000+00:00",
            "$updatedAt": "2024-05-01T10:00:00.000+00:00",
            "caption": "Blue sky today",
            "imageUrl": "https://cdn/p",
            "imageId": "f1"
        })
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_search_issues_one_request() {
        let mut backend = MockBackend::new();
        backend
            .expect_list_documents()
            .withf(|_, queries| queries == [Query::search("caption", "sky")].as_slice())
            .times(1)
            .returning(|_, _| {
                Ok(DocumentList {
                    total: 1,
                    documents: vec![post_record("p1")],
                })
            });

        let mut feed = ExploreFeed::new(queries(backend), Duration::from_millis(500));
        for term in ["s", "sk", "sky"] {
            feed.set_search(term);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(matches!(feed.view().await, ExploreView::Searching));

        assert_eq!(feed.next_search().await.as_deref(), Some("sky"));
        match feed.view().await {
            ExploreView::SearchResults(posts) => assert_eq!(posts[0].id, "p1"),
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_explore_list_shows_end_marker() {
        let mut backend = MockBackend::new();
        backend
            .expect_list_documents()
            .times(1)
            .returning(|_, _| Ok(DocumentList { total: 0, documents: vec![] }));

        let feed = ExploreFeed::new(queries(backend), Duration::from_millis(500));
        assert!(matches!(feed.view().await, ExploreView::EndOfPosts));
    }

    #[tokio::test]
    async fn visibility_is_ignored_while_searching() {
        let mut backend = MockBackend::new();
        backend.expect_list_documents().never();

        let feed = ExploreFeed::new(queries(backend), Duration::from_millis(500));
        feed.set_search("sky");

        assert!(feed.on_visibility(true).await.is_none());
        feed.set_search("");
        assert!(feed.on_visibility(false).await.is_none());
    }
}
