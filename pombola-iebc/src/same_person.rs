//! Manually reviewed same-person decisions
//!
//! When a candidate's name closely resembles someone already in the database
//! a person has to decide whether they are the same individual. Decisions
//! live in a CSV file checked into the data directory:
//!
//! ```text
//! candidate_code,candidate_name,place_slug,race_type,person_slug,person_name,same
//! 2513,John Mbadi,suba-2013,National Assembly,john-mbadi,John Mbadi Ng'ongo,yes
//! 2987,Jane Kamau,ward-kileleshwa,County Assembly,jane-kamau,Jane Wanjiru Kamau,
//! ```
//!
//! Pairs seen for the first time are appended with an empty `same` column for
//! someone to fill in before the next run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pombola_common::db::{Person, Place};

use crate::iebc::Candidate;
use crate::ImportResult;

/// Outcome of a same-person check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Same,
    Different,
    NeedsReview,
}

impl Verdict {
    fn parse(value: &str) -> Verdict {
        match value.trim().to_lowercase().as_str() {
            "yes" | "y" | "true" | "1" => Verdict::Same,
            "no" | "n" | "false" | "0" => Verdict::Different,
            _ => Verdict::NeedsReview,
        }
    }
}

/// One row of the review file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRow {
    pub candidate_code: String,
    pub candidate_name: String,
    pub place_slug: String,
    pub race_type: String,
    pub person_slug: String,
    pub person_name: String,
    #[serde(default)]
    pub same: String,
}

impl ReviewRow {
    pub fn verdict(&self) -> Verdict {
        Verdict::parse(&self.same)
    }

    fn key(&self) -> (String, String) {
        (self.candidate_code.clone(), self.person_slug.clone())
    }
}

pub struct SamePersonChecker {
    path: PathBuf,
    rows: Vec<ReviewRow>,
    index: HashMap<(String, String), usize>,
    dirty: bool,
}

impl SamePersonChecker {
    /// Load the review file; a missing file starts an empty one
    pub fn load(path: impl Into<PathBuf>) -> ImportResult<Self> {
        let path = path.into();
        let mut checker = Self {
            path,
            rows: Vec::new(),
            index: HashMap::new(),
            dirty: false,
        };

        if !checker.path.exists() {
            tracing::info!(file = %checker.path.display(), "No same-person review file yet");
            return Ok(checker);
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&checker.path)?;
        for row in reader.deserialize() {
            let row: ReviewRow = row?;
            checker.push(row);
        }

        tracing::debug!(
            file = %checker.path.display(),
            rows = checker.rows.len(),
            pending = checker.pending().len(),
            "Loaded same-person decisions"
        );

        Ok(checker)
    }

    /// Later rows for the same pair override earlier ones
    fn push(&mut self, row: ReviewRow) {
        let key = row.key();
        match self.index.get(&key) {
            Some(&i) => self.rows[i] = row,
            None => {
                self.index.insert(key, self.rows.len());
                self.rows.push(row);
            }
        }
    }

    /// Decision for a candidate and a proposed existing person
    ///
    /// An undecided pair is queued in the file and reported as needing review.
    pub fn check(
        &mut self,
        candidate: &Candidate,
        place: &Place,
        race_type: &str,
        person: &Person,
    ) -> Verdict {
        let key = (candidate.code.clone(), person.slug.clone());
        if let Some(&i) = self.index.get(&key) {
            return self.rows[i].verdict();
        }

        tracing::info!(
            code = %candidate.code,
            candidate = %candidate.full_name(),
            person = %person.slug,
            "Queued for same-person review"
        );

        self.push(ReviewRow {
            candidate_code: candidate.code.clone(),
            candidate_name: candidate.full_name(),
            place_slug: place.slug.clone(),
            race_type: race_type.to_string(),
            person_slug: person.slug.clone(),
            person_name: person.legal_name.clone(),
            same: String::new(),
        });
        self.dirty = true;
        Verdict::NeedsReview
    }

    /// Rows still awaiting a yes/no decision
    pub fn pending(&self) -> Vec<&ReviewRow> {
        self.rows
            .iter()
            .filter(|row| row.verdict() == Verdict::NeedsReview)
            .collect()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_unsaved_rows(&self) -> bool {
        self.dirty
    }

    /// Rewrite the file if rows were queued since loading
    pub fn save(&mut self) -> ImportResult<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp_path)?;
            for row in &self.rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;

        tracing::info!(
            file = %self.path.display(),
            pending = self.pending().len(),
            "Saved same-person review file"
        );
        self.dirty = false;
        Ok(())
    }
}
