//! Data layer module
//!
//! Domain models and the volatile query cache:
//! - Query keys and invalidation matching
//! - Keyed cache with in-flight deduplication
//! - Cursor-paginated infinite lists
//! - Mutation invalidation sets and status

mod cache;
mod infinite;
mod keys;
mod models;
mod mutation;

pub use cache::{QueryClient, QueryState};
pub use infinite::{InfiniteData, PageFetcher};
pub use keys::{QueryKey, QueryTag};
pub use models::*;
pub use mutation::{MutationKind, MutationStatus, MutationTracker};
