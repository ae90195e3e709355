//! Import run driver
//!
//! Walks every county, constituency and ward the IEBC knows about and gathers
//! the candidates standing there before touching the database, then
//! reconciles each race. The reconciliation is one database transaction: it
//! is committed only when the run was asked to commit, so a dry run reports
//! exactly what a real run would change. Each race runs inside its own
//! savepoint so a race that fails is undone without losing the others.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use pombola_common::config::IebcConfig;
use pombola_common::db::settings::{set_setting, LAST_ASPIRANT_IMPORT_KEY};
use sqlx::{Connection, SqliteConnection, SqlitePool};
use tracing::{info, warn};

use crate::corrections::Corrections;
use crate::db::runs::record_run;
use crate::iebc::{AreaType, Candidate, CandidateFeed};
use crate::races::{contest_key, RaceLookup, RaceTable};
use crate::reconcile::Reconciler;
use crate::report::{RaceFailure, RunReport};
use crate::same_person::SamePersonChecker;
use crate::{ImportError, ImportResult};

/// Name recorded in `import_runs.source`
pub const RUN_SOURCE: &str = "iebc-aspirants";

/// Knobs for one run
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSettings {
    pub person_match_threshold: f64,
    pub create_missing_parties: bool,
    /// Day the run acts on: new positions start today, removed ones end the day before
    pub today: NaiveDate,
    pub commit: bool,
}

impl ImportSettings {
    pub fn from_config(config: &IebcConfig, today: NaiveDate, commit: bool) -> Self {
        Self {
            person_match_threshold: config.person_match_threshold,
            create_missing_parties: config.create_missing_parties,
            today,
            commit,
        }
    }
}

/// Candidates for one contest type in one named area
struct FetchedRace {
    area_type: AreaType,
    area_name: String,
    contest_type: String,
    candidates: Vec<Candidate>,
}

pub struct Importer<F: CandidateFeed> {
    feed: F,
    races: RaceTable,
    corrections: Corrections,
    checker: SamePersonChecker,
    settings: ImportSettings,
}

impl<F: CandidateFeed> Importer<F> {
    pub fn new(
        feed: F,
        races: RaceTable,
        corrections: Corrections,
        checker: SamePersonChecker,
        settings: ImportSettings,
    ) -> Self {
        Self {
            feed,
            races,
            corrections,
            checker,
            settings,
        }
    }

    /// Run the import over every area level
    pub async fn run(&mut self, pool: &SqlitePool) -> ImportResult<RunReport> {
        let mut report = RunReport::new(Utc::now());
        info!(
            today = %self.settings.today,
            commit = self.settings.commit,
            "Starting aspirant import"
        );

        let mut fetched = Vec::new();
        for area_type in AreaType::ALL {
            fetched.extend(self.fetch_area_type(area_type).await?);
        }

        let mut tx = pool.begin().await?;
        for race in &fetched {
            self.import_race(&mut tx, race, &mut report).await?;
        }

        // Review requests are kept even when the database changes are not
        self.checker.save()?;
        if !report.deferred.is_empty() {
            report.review_file = Some(self.checker.path().display().to_string());
        }

        let ended_at = Utc::now();
        report.ended_at = Some(ended_at);

        if self.settings.commit {
            report.committed = true;
            let summary = report.to_json()?;
            record_run(&mut tx, RUN_SOURCE, report.started_at, ended_at, true, &summary).await?;
            set_setting(&mut tx, LAST_ASPIRANT_IMPORT_KEY, ended_at.to_rfc3339()).await?;
            tx.commit().await?;
            info!("Committed aspirant import");
        } else {
            tx.rollback().await?;
        }

        Ok(report)
    }

    /// Every race in one area level, grouped by area name and contest type
    async fn fetch_area_type(&self, area_type: AreaType) -> ImportResult<Vec<FetchedRace>> {
        let areas = self.feed.areas(area_type).await?;

        // The same area name can be listed under several codes
        let mut codes_by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for area in areas {
            codes_by_name.entry(area.name).or_default().push(area.code);
        }

        info!(
            area_type = %area_type,
            areas = codes_by_name.len(),
            "Fetching candidates by {}", area_type
        );

        let mut fetched = Vec::new();
        for (area_name, codes) in codes_by_name {
            let mut by_contest: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
            for code in &codes {
                for race in self.feed.candidates(area_type, code).await? {
                    for candidate in race.candidates {
                        by_contest
                            .entry(contest_key(&candidate.contest_type))
                            .or_default()
                            .push(candidate);
                    }
                }
            }

            fetched.extend(by_contest.into_iter().map(|(contest_type, candidates)| FetchedRace {
                area_type,
                area_name: area_name.clone(),
                contest_type,
                candidates,
            }));
        }

        Ok(fetched)
    }

    async fn import_race(
        &mut self,
        conn: &mut SqliteConnection,
        fetched: &FetchedRace,
        report: &mut RunReport,
    ) -> ImportResult<()> {
        let area_type = fetched.area_type;
        let area_name = fetched.area_name.as_str();
        let contest_type = fetched.contest_type.as_str();

        let failure = |reason: String| RaceFailure {
            area_type,
            area_name: area_name.to_string(),
            contest_type: contest_type.to_string(),
            reason,
        };

        let race = match self.races.lookup(contest_type) {
            RaceLookup::Mapped(race) => race.clone(),
            RaceLookup::Ignored => {
                report.record_ignored();
                return Ok(());
            }
            RaceLookup::Unknown => {
                let reason = ImportError::UnknownContestType(contest_type.to_string()).to_string();
                warn!(area = %area_name, contest = %contest_type, "{}", reason);
                report.record_failure(failure(reason));
                return Ok(());
            }
        };

        let mut savepoint = conn.begin().await?;
        let result = Reconciler::new(&self.corrections, &mut self.checker, &self.settings)
            .reconcile_race(&mut savepoint, area_name, &race, &fetched.candidates)
            .await;

        match result {
            Ok(outcome) => {
                savepoint.commit().await?;
                info!(
                    area = %area_name,
                    race = %race.race_type,
                    added = outcome.candidates_added,
                    ended = outcome.candidates_removed,
                    unchanged = outcome.candidates_unchanged,
                    "Reconciled race"
                );
                report.record_success(&outcome);
            }
            Err(e) if e.is_race_scoped() => {
                savepoint.rollback().await?;
                let deferral = e.is_review_deferral();
                warn!(area = %area_name, race = %race.race_type, deferred = deferral, "Race not updated: {}", e);
                if deferral {
                    report.record_deferral(failure(e.to_string()));
                } else {
                    report.record_failure(failure(e.to_string()));
                }
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }
}
