//! Run report
//!
//! Summarises an import run: which races were reconciled, which failed and
//! why, which were held back for review, and how many rows changed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::iebc::AreaType;
use crate::reconcile::RaceOutcome;
use crate::ImportResult;

/// A race that did not complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaceFailure {
    pub area_type: AreaType,
    pub area_name: String,
    pub contest_type: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub committed: bool,
    pub races_processed: usize,
    pub races_succeeded: usize,
    pub races_ignored: usize,
    pub failed: Vec<RaceFailure>,
    pub deferred: Vec<RaceFailure>,
    /// Same-person file to fill in when races were deferred
    pub review_file: Option<String>,
    pub totals: RaceOutcome,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            ended_at: None,
            committed: false,
            races_processed: 0,
            races_succeeded: 0,
            races_ignored: 0,
            failed: Vec::new(),
            deferred: Vec::new(),
            review_file: None,
            totals: RaceOutcome::default(),
        }
    }

    pub fn record_success(&mut self, outcome: &RaceOutcome) {
        self.races_processed += 1;
        self.races_succeeded += 1;
        self.totals.absorb(outcome);
    }

    pub fn record_failure(&mut self, failure: RaceFailure) {
        self.races_processed += 1;
        self.failed.push(failure);
    }

    pub fn record_deferral(&mut self, failure: RaceFailure) {
        self.races_processed += 1;
        self.deferred.push(failure);
    }

    pub fn record_ignored(&mut self) {
        self.races_ignored += 1;
    }

    /// Every race that was attempted finished without error or deferral
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.deferred.is_empty()
    }

    pub fn to_json(&self) -> ImportResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> ImportResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Wrote run report: {}", path.display());
        Ok(())
    }

    pub fn log_summary(&self) {
        info!(
            committed = self.committed,
            processed = self.races_processed,
            succeeded = self.races_succeeded,
            failed = self.failed.len(),
            deferred = self.deferred.len(),
            ignored = self.races_ignored,
            "Aspirant import finished"
        );
        info!(
            people_created = self.totals.people_created,
            parties_created = self.totals.parties_created,
            positions_created = self.totals.positions_created,
            positions_updated = self.totals.positions_updated,
            positions_ended = self.totals.positions_ended,
            "Changes"
        );

        for failure in &self.failed {
            warn!(
                area_type = %failure.area_type,
                area = %failure.area_name,
                contest = %failure.contest_type,
                "Race failed: {}",
                failure.reason
            );
        }

        if !self.deferred.is_empty() {
            let file = self.review_file.as_deref().unwrap_or("the same-person review file");
            warn!(
                "{} race(s) await manual review: fill in the 'same' column in {} and run again",
                self.deferred.len(),
                file
            );
        }

        if !self.committed {
            info!("Dry run: no changes were saved (use --commit to apply them)");
        }
    }
}
