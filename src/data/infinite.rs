//! Infinite (cursor-paginated) queries
//!
//! Pages accumulate in fetch order under a single cache entry. The cursor
//! for the next page is the id of the last item of the most recently
//! fetched page; an empty page ends the list for good.

use std::sync::Arc;

use futures::future::BoxFuture;

use super::cache::{QueryClient, QueryState};
use super::keys::QueryKey;
use super::models::HasId;
use crate::error::AppError;

/// Loads one page given the cursor of the previous page
pub type PageFetcher<T> =
    Arc<dyn Fn(Option<String>) -> BoxFuture<'static, Result<Vec<T>, AppError>> + Send + Sync>;

/// Pages of an infinite list plus the cursors that produced them
#[derive(Debug)]
pub struct InfiniteData<T> {
    pub pages: Vec<Arc<Vec<T>>>,
    /// Cursor each page was requested with (`None` for the first page)
    pub page_params: Vec<Option<String>>,
    exhausted: bool,
}

impl<T> InfiniteData<T> {
    fn empty() -> Self {
        Self {
            pages: Vec::new(),
            page_params: Vec::new(),
            exhausted: false,
        }
    }

    fn push(&mut self, param: Option<String>, page: Vec<T>) {
        if page.is_empty() {
            self.exhausted = true;
        }
        self.pages.push(Arc::new(page));
        self.page_params.push(param);
    }

    /// All items in fetch order
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|page| page.iter())
    }

    /// True when every fetched page is empty
    pub fn all_pages_empty(&self) -> bool {
        self.pages.iter().all(|page| page.is_empty())
    }
}

impl<T: HasId> InfiniteData<T> {
    /// Cursor for the next page, `None` once an empty page was fetched
    pub fn next_page_param(&self) -> Option<String> {
        if self.exhausted {
            return None;
        }
        self.pages
            .last()
            .and_then(|page| page.last())
            .map(|item| item.id().to_string())
    }

    pub fn has_next_page(&self) -> bool {
        self.next_page_param().is_some()
    }
}

impl<T> Clone for InfiniteData<T> {
    fn clone(&self) -> Self {
        Self {
            pages: self.pages.clone(),
            page_params: self.page_params.clone(),
            exhausted: self.exhausted,
        }
    }
}

impl QueryClient {
    /// Read hook for an infinite list
    ///
    /// First read loads the first page. A stale list is refreshed in the
    /// background by refetching as many pages as were loaded.
    pub async fn infinite_query<T>(
        &self,
        key: QueryKey,
        fetch_page: PageFetcher<T>,
    ) -> QueryState<InfiniteData<T>>
    where
        T: HasId + Send + Sync + 'static,
    {
        let cached = self.peek::<InfiniteData<T>>(&key);
        let Some(data) = cached.data.clone() else {
            let _ = self
                .fetch(key.clone(), move || first_page(fetch_page))
                .await;
            return self.peek(&key);
        };

        if !cached.is_stale {
            return cached;
        }

        self.refresh_in_background(key, move || refetch_pages(fetch_page, data));
        QueryState {
            is_fetching: true,
            ..cached
        }
    }

    /// Append the next page
    ///
    /// No-op once the list is exhausted. Joins the in-flight fetch if the
    /// list is already being loaded or refreshed.
    pub async fn fetch_next_page<T>(
        &self,
        key: QueryKey,
        fetch_page: PageFetcher<T>,
    ) -> Result<Arc<InfiniteData<T>>, Arc<AppError>>
    where
        T: HasId + Send + Sync + 'static,
    {
        let Some(data) = self.get_query_data::<InfiniteData<T>>(&key) else {
            return self.fetch(key, move || first_page(fetch_page)).await;
        };

        let Some(cursor) = data.next_page_param() else {
            tracing::trace!(key = %key, "No next page");
            return Ok(data);
        };

        self.fetch(key, move || append_page(fetch_page, data, cursor))
            .await
    }
}

async fn first_page<T>(fetch_page: PageFetcher<T>) -> Result<InfiniteData<T>, AppError> {
    let page = fetch_page(None).await?;
    let mut data = InfiniteData::empty();
    data.push(None, page);
    Ok(data)
}

async fn append_page<T>(
    fetch_page: PageFetcher<T>,
    current: Arc<InfiniteData<T>>,
    cursor: String,
) -> Result<InfiniteData<T>, AppError> {
    let page = fetch_page(Some(cursor.clone())).await?;
    let mut next = (*current).clone();
    next.push(Some(cursor), page);
    Ok(next)
}

async fn refetch_pages<T: HasId>(
    fetch_page: PageFetcher<T>,
    current: Arc<InfiniteData<T>>,
) -> Result<InfiniteData<T>, AppError> {
    let target = current.pages.len().max(1);
    let mut data = InfiniteData::empty();
    let mut cursor = None;

    for _ in 0..target {
        let page = fetch_page(cursor.clone()).await?;
        data.push(cursor, page);
        match data.next_page_param() {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    data.exhausted |= current.exhausted;
    Ok(data)
}
