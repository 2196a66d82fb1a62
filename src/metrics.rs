//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{Counter, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Gateway Metrics
    pub static ref GATEWAY_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("reactgram_gateway_requests_total", "Total number of requests sent to the platform"),
        &["service", "status"]
    ).expect("metric can be created");
    pub static ref GATEWAY_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "reactgram_gateway_request_duration_seconds",
            "Platform request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service"]
    ).expect("metric can be created");

    // Query Cache Metrics
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("reactgram_cache_hits_total", "Reads answered from a cache entry"),
        &["query"]
    ).expect("metric can be created");
    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("reactgram_cache_misses_total", "Reads that found no cached data"),
        &["query"]
    ).expect("metric can be created");
    pub static ref QUERY_FETCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("reactgram_query_fetches_total", "Fetches issued by the query cache"),
        &["query"]
    ).expect("metric can be created");
    pub static ref QUERY_DEDUPLICATED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("reactgram_query_deduplicated_total", "Reads that joined an in-flight fetch"),
        &["query"]
    ).expect("metric can be created");
    pub static ref CACHE_INVALIDATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("reactgram_cache_invalidations_total", "Cache entries marked stale"),
        &["query"]
    ).expect("metric can be created");
    pub static ref CACHE_ENTRIES: IntGauge = IntGauge::new(
        "reactgram_cache_entries",
        "Current number of query cache entries"
    ).expect("metric can be created");

    // Mutation Metrics
    pub static ref MUTATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("reactgram_mutations_total", "Mutations by outcome"),
        &["mutation", "status"]
    ).expect("metric can be created");

    // Storage Metrics
    pub static ref MEDIA_UPLOADS_TOTAL: IntCounter = IntCounter::new(
        "reactgram_media_uploads_total",
        "Total number of media uploads"
    ).expect("metric can be created");
    pub static ref MEDIA_BYTES_UPLOADED: Counter = Counter::new(
        "reactgram_media_bytes_uploaded_total",
        "Total bytes of media uploaded"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("reactgram_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(GATEWAY_REQUESTS_TOTAL.clone()))
            .expect("GATEWAY_REQUESTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(GATEWAY_REQUEST_DURATION_SECONDS.clone()))
            .expect("GATEWAY_REQUEST_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(CACHE_HITS_TOTAL.clone()))
            .expect("CACHE_HITS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(CACHE_MISSES_TOTAL.clone()))
            .expect("CACHE_MISSES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(QUERY_FETCHES_TOTAL.clone()))
            .expect("QUERY_FETCHES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(QUERY_DEDUPLICATED_TOTAL.clone()))
            .expect("QUERY_DEDUPLICATED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(CACHE_INVALIDATIONS_TOTAL.clone()))
            .expect("CACHE_INVALIDATIONS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(CACHE_ENTRIES.clone()))
            .expect("CACHE_ENTRIES can be registered");
        REGISTRY
            .register(Box::new(MUTATIONS_TOTAL.clone()))
            .expect("MUTATIONS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(MEDIA_UPLOADS_TOTAL.clone()))
            .expect("MEDIA_UPLOADS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(MEDIA_BYTES_UPLOADED.clone()))
            .expect("MEDIA_BYTES_UPLOADED can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}

/// Render the registry in the Prometheus text format.
pub fn render() -> String {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(error) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!(%error, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
