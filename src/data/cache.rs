//! Query cache
//!
//! Volatile, cleared on restart. Each entry holds the last fetched value
//! for one [`QueryKey`] plus its staleness, error and in-flight state.
//! Concurrent reads of one key share a single fetch; within an entry the
//! last-issued fetch wins.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::broadcast;

use super::keys::QueryKey;
use crate::error::AppError;
use crate::metrics::{
    CACHE_ENTRIES, CACHE_HITS_TOTAL, CACHE_INVALIDATIONS_TOTAL, CACHE_MISSES_TOTAL,
    QUERY_DEDUPLICATED_TOTAL, QUERY_FETCHES_TOTAL,
};

type CachedValue = Arc<dyn Any + Send + Sync>;
type FetchOutcome = Result<CachedValue, Arc<AppError>>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

const EVENT_CAPACITY: usize = 256;

// =============================================================================
// Query State
// =============================================================================

/// Snapshot of one cache entry as seen by a view
#[derive(Debug)]
pub struct QueryState<T> {
    /// `None` until the first successful fetch
    pub data: Option<Arc<T>>,
    /// Error of the most recent settled fetch, if it failed
    pub error: Option<Arc<AppError>>,
    /// No data yet and a fetch is in flight
    pub is_loading: bool,
    /// A fetch is in flight
    pub is_fetching: bool,
    /// Next read will refetch
    pub is_stale: bool,
}

impl<T> QueryState<T> {
    /// State of a disabled or never-read query
    pub fn idle() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: false,
            is_fetching: false,
            is_stale: true,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.data.is_some() && self.error.is_none()
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            is_loading: self.is_loading,
            is_fetching: self.is_fetching,
            is_stale: self.is_stale,
        }
    }
}

// =============================================================================
// Cache Entry
// =============================================================================

struct InFlight {
    seq: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct CacheEntry {
    data: Option<CachedValue>,
    error: Option<Arc<AppError>>,
    updated_at: Option<Instant>,
    invalidated: bool,
    /// Fetches issued at or before this sequence cannot clear `invalidated`
    invalidated_through: u64,
    /// Sequence of the fetch whose outcome is currently stored
    applied_seq: u64,
    in_flight: Option<InFlight>,
}

impl CacheEntry {
    fn is_stale(&self, stale_time: Duration) -> bool {
        self.invalidated
            || match self.updated_at {
                Some(updated_at) => updated_at.elapsed() >= stale_time,
                None => true,
            }
    }
}

// =============================================================================
// Query Client
// =============================================================================

struct Inner {
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
    stale_time: Duration,
    next_seq: AtomicU64,
    events: broadcast::Sender<QueryKey>,
}

/// Keyed request cache shared by every view
///
/// Cheap to clone; clones share entries.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl QueryClient {
    /// Create a cache whose entries stay fresh for `stale_time` after a fetch
    pub fn new(stale_time: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                stale_time,
                next_seq: AtomicU64::new(0),
                events,
            }),
        }
    }

    pub fn stale_time(&self) -> Duration {
        self.inner.stale_time
    }

    /// Receive the key of every entry whose data or staleness changed
    pub fn subscribe(&self) -> broadcast::Receiver<QueryKey> {
        self.inner.events.subscribe()
    }

    pub fn entry_count(&self) -> usize {
        self.lock().len()
    }

    /// Read hook
    ///
    /// Cached data is returned immediately; if it is stale a refresh is
    /// started in the background. With no cached data the fetch is awaited.
    pub async fn query<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let cached = self.peek::<T>(&key);
        if cached.data.is_some() {
            CACHE_HITS_TOTAL
                .with_label_values(&[key.tag.as_str()])
                .inc();
            if cached.is_stale {
                self.refresh_in_background(key, fetcher);
                return QueryState {
                    is_fetching: true,
                    ..cached
                };
            }
            return cached;
        }

        CACHE_MISSES_TOTAL
            .with_label_values(&[key.tag.as_str()])
            .inc();
        // The outcome is already stored in the entry by `fetch`.
        let _ = self.fetch(key.clone(), fetcher).await;
        self.peek(&key)
    }

    /// Fetch `key`, joining an in-flight fetch for the same key if any
    ///
    /// The fetcher is only invoked when no fetch is in flight.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Arc<T>, Arc<AppError>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let (seq, fetch) = self.join_or_issue(&key, fetcher);
        let outcome = fetch.await;
        self.settle(&key, seq, &outcome);
        downcast(&key, outcome)
    }

    /// Current snapshot of `key` without fetching
    pub fn peek<T>(&self, key: &QueryKey) -> QueryState<T>
    where
        T: Send + Sync + 'static,
    {
        let entries = self.lock();
        let Some(entry) = entries.get(key) else {
            return QueryState::idle();
        };

        let (data, error) = match &entry.data {
            Some(value) => match value.clone().downcast::<T>() {
                Ok(data) => (Some(data), entry.error.clone()),
                Err(_) => (None, Some(Arc::new(AppError::TypeMismatch(key.to_string())))),
            },
            None => (None, entry.error.clone()),
        };

        QueryState {
            is_loading: data.is_none() && entry.in_flight.is_some(),
            is_fetching: entry.in_flight.is_some(),
            is_stale: entry.is_stale(self.inner.stale_time),
            data,
            error,
        }
    }

    /// Cached data for `key`, if any
    pub fn get_query_data<T>(&self, key: &QueryKey) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.peek(key).data
    }

    /// Write `value` into `key` as if it had just been fetched
    ///
    /// Fetches already in flight for `key` can no longer overwrite it.
    pub fn set_query_data<T>(&self, key: QueryKey, value: T)
    where
        T: Send + Sync + 'static,
    {
        let seq = self.issue_seq();
        {
            let mut entries = self.lock();
            let entry = entries.entry(key.clone()).or_default();
            entry.data = Some(Arc::new(value));
            entry.error = None;
            entry.updated_at = Some(Instant::now());
            entry.invalidated = false;
            entry.applied_seq = seq;
            CACHE_ENTRIES.set(entries.len() as i64);
        }
        let _ = self.inner.events.send(key);
    }

    /// Mark every entry matched by `target` stale
    ///
    /// In-flight fetches for matched entries are detached: they complete
    /// without cancellation but can no longer mark the entry fresh.
    /// Returns the number of entries touched.
    pub fn invalidate(&self, target: &QueryKey) -> usize {
        let watermark = self.inner.next_seq.load(Ordering::SeqCst);
        let touched: Vec<QueryKey> = {
            let mut entries = self.lock();
            entries
                .iter_mut()
                .filter(|(key, _)| key.starts_with(target))
                .map(|(key, entry)| {
                    entry.invalidated = true;
                    entry.invalidated_through = watermark;
                    entry.in_flight = None;
                    key.clone()
                })
                .collect()
        };

        for key in &touched {
            CACHE_INVALIDATIONS_TOTAL
                .with_label_values(&[key.tag.as_str()])
                .inc();
            let _ = self.inner.events.send(key.clone());
        }

        tracing::debug!(target = %target, count = touched.len(), "Invalidated queries");
        touched.len()
    }

    /// Drop every entry matched by `target`
    pub fn remove(&self, target: &QueryKey) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(target));
        CACHE_ENTRIES.set(entries.len() as i64);
        before - entries.len()
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.clear();
        CACHE_ENTRIES.set(0);
    }

    /// Issue (or join) a fetch for `key` and settle it on a spawned task
    pub(crate) fn refresh_in_background<T, F, Fut>(&self, key: QueryKey, fetcher: F)
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let (seq, fetch) = self.join_or_issue(&key, fetcher);
        let client = self.clone();
        tokio::spawn(async move {
            let outcome = fetch.await;
            client.settle(&key, seq, &outcome);
        });
    }

    fn join_or_issue<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> (u64, SharedFetch)
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let mut entries = self.lock();
        let entry = entries.entry(key.clone()).or_default();

        if let Some(in_flight) = &entry.in_flight {
            QUERY_DEDUPLICATED_TOTAL
                .with_label_values(&[key.tag.as_str()])
                .inc();
            return (in_flight.seq, in_flight.fetch.clone());
        }

        let seq = self.issue_seq();
        let request = fetcher();
        let fetch = async move {
            request
                .await
                .map(|value| Arc::new(value) as CachedValue)
                .map_err(Arc::new)
        }
        .boxed()
        .shared();

        entry.in_flight = Some(InFlight {
            seq,
            fetch: fetch.clone(),
        });
        CACHE_ENTRIES.set(entries.len() as i64);
        QUERY_FETCHES_TOTAL
            .with_label_values(&[key.tag.as_str()])
            .inc();
        tracing::debug!(key = %key, seq, "Issuing fetch");

        (seq, fetch)
    }

    /// Store a fetch outcome unless a later-issued fetch already settled
    fn settle(&self, key: &QueryKey, seq: u64, outcome: &FetchOutcome) {
        {
            let mut entries = self.lock();
            let Some(entry) = entries.get_mut(key) else {
                return;
            };

            if entry
                .in_flight
                .as_ref()
                .is_some_and(|in_flight| in_flight.seq == seq)
            {
                entry.in_flight = None;
            }

            if seq <= entry.applied_seq {
                return;
            }
            entry.applied_seq = seq;

            match outcome {
                Ok(value) => {
                    entry.data = Some(value.clone());
                    entry.error = None;
                    entry.updated_at = Some(Instant::now());
                    entry.invalidated = seq <= entry.invalidated_through;
                }
                Err(error) => {
                    error.record();
                    tracing::warn!(key = %key, error = %error, "Query fetch failed");
                    entry.error = Some(error.clone());
                }
            }
        }

        let _ = self.inner.events.send(key.clone());
    }

    fn issue_seq(&self) -> u64 {
        self.inner.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn downcast<T>(key: &QueryKey, outcome: FetchOutcome) -> Result<Arc<T>, Arc<AppError>>
where
    T: Send + Sync + 'static,
{
    outcome?
        .downcast::<T>()
        .map_err(|_| Arc::new(AppError::TypeMismatch(key.to_string())))
}
