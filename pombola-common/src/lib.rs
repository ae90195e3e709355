//! # Pombola Common Library
//!
//! Shared code for the Pombola data tools:
//! - Database schema and row models (people, places, organisations, positions)
//! - Approximate dates and the "currently active" rule
//! - Slug generation
//! - Configuration loading and root folder resolution

pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod slug;

pub use dates::ApproximateDate;
pub use error::{Error, Result};
pub use slug::{slugify, with_numeric_suffix};
