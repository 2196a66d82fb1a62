//! Explore feed
//!
//! Debounced post search plus the visibility-driven infinite list.

mod debounce;
mod explore;

pub use debounce::{Debounced, debounce};
pub use explore::{ExploreFeed, ExploreView};
