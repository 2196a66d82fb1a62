//! Reactgram - cache-synchronized client data layer for a social feed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Interaction / Session / Explore                 │
//! │  - Optimistic like and save toggles                         │
//! │  - Authenticated-user store and auth flows                  │
//! │  - Debounced search and infinite explore list               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Query Cache Layer                         │
//! │  - Keyed entries with staleness and deduplication           │
//! │  - Cursor pagination                                        │
//! │  - Mutation tracking and key invalidation                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Gateway                               │
//! │  - Typed domain operations                                  │
//! │  - Document schemas and error normalization                 │
//! │  - Platform REST backend (reqwest)                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `backend`: Platform REST client behind the `Backend` trait
//! - `gateway`: Domain operations over the backend
//! - `storage`: Media upload and preview
//! - `data`: Models, query cache, keys, pagination, mutation tracking
//! - `queries`: Cached reads and invalidating mutations
//! - `interaction`: Per-post like/save state
//! - `auth`: Session store, fallback flag and auth flows
//! - `feed`: Explore page search and list
//! - `config`: Configuration management
//! - `error`: Error types

pub mod auth;
pub mod backend;
pub mod config;
pub mod data;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod interaction;
pub mod metrics;
pub mod queries;
pub mod storage;

use std::sync::Arc;

/// Client state shared across views
///
/// Cheap to clone; every clone observes the same cache and session.
#[derive(Clone)]
pub struct ClientState {
    /// Client configuration
    pub config: Arc<config::AppConfig>,

    /// Domain operations against the platform
    pub gateway: Arc<gateway::Gateway>,

    /// Cached reads and mutations
    pub queries: queries::Queries,

    /// Authenticated-user store
    pub session: auth::SessionStore,

    /// Persisted session fallback flag
    pub fallback: auth::SessionFallback,
}

impl ClientState {
    /// Initialize client state against the configured platform
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built or the fallback
    /// file cannot be read
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing client state...");

        let fallback = auth::SessionFallback::new(&config.session.fallback_path);
        let backend = backend::HttpBackend::new(&config.backend, fallback.clone()).await?;
        tracing::info!(endpoint = %config.backend.base_url(), "Backend client initialized");

        Ok(Self::assemble(config, Arc::new(backend), fallback))
    }

    /// Assemble client state over any backend
    pub fn with_backend(config: config::AppConfig, backend: Arc<dyn backend::Backend>) -> Self {
        let fallback = auth::SessionFallback::new(&config.session.fallback_path);
        Self::assemble(config, backend, fallback)
    }

    fn assemble(
        config: config::AppConfig,
        backend: Arc<dyn backend::Backend>,
        fallback: auth::SessionFallback,
    ) -> Self {
        let gateway = Arc::new(gateway::Gateway::new(backend, &config));
        let client = data::QueryClient::new(config.cache.stale_time());
        let queries = queries::Queries::new(gateway.clone(), client);
        let session = auth::SessionStore::new(queries.clone());

        Self {
            config: Arc::new(config),
            gateway,
            queries,
            session,
            fallback,
        }
    }

    /// Decide the first screen from the persisted flag and the session check
    pub async fn bootstrap(&self) -> Result<auth::Destination, error::AppError> {
        auth::bootstrap(&self.session, &self.fallback).await
    }

    pub async fn sign_up(&self, user: data::NewUser) -> Result<auth::Destination, error::AppError> {
        auth::sign_up(&self.queries, &self.session, user).await
    }

    pub async fn sign_in(
        &self,
        credentials: data::SignInCredentials,
    ) -> Result<auth::Destination, error::AppError> {
        auth::sign_in(&self.queries, &self.session, credentials).await
    }

    pub async fn sign_out(&self) -> Result<auth::Destination, error::AppError> {
        auth::sign_out(&self.queries, &self.session).await
    }

    /// Explore page state with the configured search debounce
    pub fn explore(&self) -> feed::ExploreFeed {
        feed::ExploreFeed::new(self.queries.clone(), self.config.cache.search_debounce())
    }

    /// Like/save state for one rendered post
    pub fn post_stats(&self, post: &data::Post, user_id: &str) -> interaction::PostStats {
        interaction::PostStats::new(self.queries.clone(), post, user_id)
    }
}
