//! IEBC API access
//!
//! - [`client`]: authenticated, rate-limited HTTP client with pagination
//! - [`cache`]: on-disk cache of raw responses
//! - [`feed`]: typed area/candidate feed used by the importer

pub mod cache;
pub mod client;
pub mod feed;
pub mod types;

pub use cache::ResponseCache;
pub use client::{signing_key, ApiError, IebcClient};
pub use feed::{CandidateFeed, IebcFeed};
pub use types::{Area, AreaType, Candidate, Party, Race};
