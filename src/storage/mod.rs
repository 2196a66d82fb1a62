//! Platform file storage module
//!
//! Handles post media upload, preview URLs and deletion.

mod media;

pub use media::MediaStorage;
