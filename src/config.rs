//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub cache: CacheConfig,
    pub media: MediaConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Hosted platform configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// REST endpoint (e.g., "https://cloud.appwrite.io/v1")
    pub endpoint: String,
    /// Platform project ID
    pub project_id: String,
    /// Document database ID
    pub database_id: String,
    /// Collection holding mirrored user documents
    pub user_collection_id: String,
    /// Collection holding posts
    pub post_collection_id: String,
    /// Collection holding saved-post records
    pub saves_collection_id: String,
    /// Storage bucket for post media
    pub storage_id: String,
    /// Per-request timeout in seconds (default: 30)
    pub request_timeout_secs: u64,
}

impl BackendConfig {
    /// Endpoint without trailing slash
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Query cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// How long fetched data counts as fresh, in milliseconds (default: 0)
    pub stale_time_ms: u64,
    /// Posts on the home feed (default: 20)
    pub recent_posts_limit: usize,
    /// Posts per explore page (default: 10)
    pub page_size: usize,
    /// Users on the people page (default: 10)
    pub users_limit: usize,
    /// Quiet period before a search is issued, in milliseconds (default: 500)
    pub search_debounce_ms: u64,
}

impl CacheConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_ms: 0,
            recent_posts_limit: 20,
            page_size: 10,
            users_limit: 10,
            search_debounce_ms: 500,
        }
    }
}

/// Media preview transform
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MediaConfig {
    pub preview_width: u32,
    pub preview_height: u32,
    /// Crop anchor: center, top, top-left, ...
    pub preview_gravity: String,
    /// JPEG/WebP quality 0-100
    pub preview_quality: u8,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            preview_width: 2000,
            preview_height: 2000,
            preview_gravity: "top".to_string(),
            preview_quality: 100,
        }
    }
}

/// Persisted session flag location
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// File holding the last-known fallback cookie value
    pub fallback_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }

    /// Filter directive used when `RUST_LOG` is not set
    pub fn default_filter(&self) -> String {
        format!("reactgram={}", self.level.to_ascii_lowercase())
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (REACTGRAM_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("backend.request_timeout_secs", 30)?
            .set_default("cache.stale_time_ms", 0)?
            .set_default("cache.recent_posts_limit", 20)?
            .set_default("cache.page_size", 10)?
            .set_default("cache.users_limit", 10)?
            .set_default("cache.search_debounce_ms", 500)?
            .set_default("media.preview_width", 2000)?
            .set_default("media.preview_height", 2000)?
            .set_default("media.preview_gravity", "top")?
            .set_default("media.preview_quality", 100)?
            .set_default("session.fallback_path", ".reactgram/cookie-fallback")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("REACTGRAM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        let endpoint = url::Url::parse(&self.backend.endpoint).map_err(|e| {
            AppError::Config(format!("backend.endpoint is not a valid URL: {}", e))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(AppError::Config(
                "backend.endpoint must use http or https".to_string(),
            ));
        }

        let required = [
            ("backend.project_id", &self.backend.project_id),
            ("backend.database_id", &self.backend.database_id),
            ("backend.user_collection_id", &self.backend.user_collection_id),
            ("backend.post_collection_id", &self.backend.post_collection_id),
            ("backend.saves_collection_id", &self.backend.saves_collection_id),
            ("backend.storage_id", &self.backend.storage_id),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::Config(format!("{} must not be empty", name)));
            }
        }

        if self.cache.page_size == 0
            || self.cache.recent_posts_limit == 0
            || self.cache.users_limit == 0
        {
            return Err(AppError::Config(
                "cache page sizes must be greater than 0".to_string(),
            ));
        }

        if self.media.preview_quality > 100 {
            return Err(AppError::Config(
                "media.preview_quality must be between 0 and 100".to_string(),
            ));
        }

        if !matches!(
            self.logging.level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(AppError::Config(format!(
                "logging.level '{}' is not a log level",
                self.logging.level
            )));
        }
        if !self.logging.is_json() && !self.logging.format.eq_ignore_ascii_case("pretty") {
            return Err(AppError::Config(
                "logging.format must be pretty or json".to_string(),
            ));
        }

        Ok(())
    }

    /// Log warnings for settings that work but should not ship
    ///
    /// Called once the subscriber is installed.
    pub fn warn_insecure(&self) {
        if self.backend.endpoint.starts_with("http://") {
            tracing::warn!(
                endpoint = %self.backend.endpoint,
                "Using an unencrypted platform endpoint"
            );
        }
    }
}
