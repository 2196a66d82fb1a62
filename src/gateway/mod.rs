//! Remote data gateway
//!
//! One method per domain operation, translating it into calls against the
//! platform's document, account and file services. Reads report expected
//! absence as `Ok(None)`; compound writes roll back on partial failure.

mod account;
mod documents;
mod post;
mod saved;

pub use account::NewUserRecord;

use std::sync::Arc;

use crate::backend::Backend;
use crate::config::{AppConfig, CacheConfig};
use crate::error::AppError;
use crate::storage::MediaStorage;

/// Collection ids of the mirrored domain documents
#[derive(Debug, Clone)]
struct Collections {
    users: String,
    posts: String,
    saves: String,
}

/// Typed access to the hosted platform
pub struct Gateway {
    backend: Arc<dyn Backend>,
    media: MediaStorage,
    collections: Collections,
    limits: CacheConfig,
}

impl Gateway {
    pub fn new(backend: Arc<dyn Backend>, config: &AppConfig) -> Self {
        let media = MediaStorage::new(
            backend.clone(),
            config.backend.storage_id.clone(),
            config.media.clone(),
        );

        Self {
            backend,
            media,
            collections: Collections {
                users: config.backend.user_collection_id.clone(),
                posts: config.backend.post_collection_id.clone(),
                saves: config.backend.saves_collection_id.clone(),
            },
            limits: config.cache.clone(),
        }
    }
}

/// Split free-text tags on commas after removing all whitespace
///
/// Empty segments are dropped, so `""` and `" , "` both yield no tags.
pub fn parse_tags(input: &str) -> Vec<String> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .split(',')
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Turn expected absence into `Ok(None)`
fn optional<T>(result: Result<T, AppError>) -> Result<Option<T>, AppError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_absent() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Fault on an empty required id
fn require(name: &'static str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::MissingArgument(name));
    }
    Ok(())
}
