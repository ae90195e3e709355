//! Error types for the aspirant importer
//!
//! Errors split into two groups. Race-scoped errors (a place or party that
//! cannot be matched, a candidate awaiting manual review) abort only the race
//! being reconciled; the run carries on and reports them. Everything else
//! (storage, API, malformed files) aborts the run.

use crate::iebc::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IEBC API error: {0}")]
    Api(#[from] ApiError),

    #[error("No place matched '{slug}' (kind {kind}, session {session})")]
    PlaceNotFound {
        slug: String,
        kind: String,
        session: String,
    },

    #[error("No party matched '{0}'")]
    PartyNotFound(String),

    #[error("Multiple parties matched '{name}': {matches:?}")]
    AmbiguousParty { name: String, matches: Vec<String> },

    #[error("Unknown contest type '{0}'")]
    UnknownContestType(String),

    /// A row the import relies on (organisation, title, kind, session) is absent
    #[error("Missing reference data: {0}")]
    MissingReference(String),

    #[error("Candidate '{code}' {problem}")]
    InvalidCandidate { code: String, problem: String },

    /// One or more candidates await a same-person decision in the review file
    #[error("{} candidate(s) need manual review: {}", .0.len(), .0.join(", "))]
    NeedsReview(Vec<String>),

    #[error("Correction file {path}: {message}")]
    Corrections { path: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Common(#[from] pombola_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ImportError {
    /// Whether this error should only abort the current race
    pub fn is_race_scoped(&self) -> bool {
        matches!(
            self,
            ImportError::PlaceNotFound { .. }
                | ImportError::PartyNotFound(_)
                | ImportError::AmbiguousParty { .. }
                | ImportError::UnknownContestType(_)
                | ImportError::MissingReference(_)
                | ImportError::InvalidCandidate { .. }
                | ImportError::NeedsReview(_)
        )
    }

    /// Whether the race was held back for manual review rather than failing
    pub fn is_review_deferral(&self) -> bool {
        matches!(self, ImportError::NeedsReview(_))
    }
}

pub type ImportResult<T> = Result<T, ImportError>;
