//! pombola-iebc: IEBC aspirant reconciliation
//!
//! Brings Mzalendo's aspirant positions in line with the candidate lists
//! published by Kenya's Independent Electoral and Boundaries Commission.
//! For every race the set of currently tracked aspirants is compared with the
//! set the IEBC reports: new candidates get positions, dropped candidates have
//! their positions ended, and everyone else is left alone.

pub mod config;
pub mod corrections;
pub mod db;
pub mod error;
pub mod iebc;
pub mod importer;
pub mod normalize;
pub mod person_matcher;
pub mod races;
pub mod reconcile;
pub mod report;
pub mod same_person;

pub use crate::error::{ImportError, ImportResult};
pub use crate::importer::{ImportSettings, Importer};
pub use crate::report::RunReport;

/// File names inside the election data directory
pub mod data_files {
    pub const WARD_NAME_CORRECTIONS: &str = "wards-names-matched.csv";
    pub const PARTY_NAME_CORRECTIONS: &str = "party-names-matched.csv";
    pub const SAME_PERSON_REVIEW: &str = "names-manually-checked.csv";
}
