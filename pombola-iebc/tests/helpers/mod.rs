//! Shared fixtures for pombola-iebc integration tests
//!
//! An in-memory database seeded with the places, sessions and organisations
//! the tests refer to, and a static feed standing in for the IEBC API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use pombola_common::db::init::{create_schema, init_reference_data};
use pombola_iebc::corrections::Corrections;
use pombola_iebc::iebc::{ApiError, Area, AreaType, Candidate, CandidateFeed, Party, Race};
use pombola_iebc::races::RaceTable;
use pombola_iebc::same_person::SamePersonChecker;
use pombola_iebc::{ImportError, ImportResult, ImportSettings, Importer};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const REVIEW_FILE: &str = "names-manually-checked.csv";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2013, 2, 14).unwrap()
}

pub const TODAY: &str = "2013-02-14";
pub const YESTERDAY: &str = "2013-02-13";
pub const FUTURE: &str = "9999-12-31";

/// Ids of the seeded rows
pub struct Seed {
    pub nairobi_county: i64,
    pub westlands: i64,
    pub kitisuru: i64,
    pub republic: i64,
    pub odm: i64,
    pub kanu: i64,
    pub governor_title: i64,
    pub mp_title: i64,
    pub member_title: i64,
}

/// Single-connection in-memory database with the full schema
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();
    init_reference_data(&pool).await.unwrap();
    pool
}

async fn id_of(pool: &SqlitePool, sql: &str, slug: &str) -> i64 {
    sqlx::query_scalar(sql).bind(slug).fetch_one(pool).await.unwrap()
}

async fn insert_place(pool: &SqlitePool, name: &str, slug: &str, kind: &str, session: &str) -> i64 {
    let kind_id = id_of(pool, "SELECT id FROM place_kinds WHERE slug = ?", kind).await;
    let session_id = id_of(pool, "SELECT id FROM parliamentary_sessions WHERE slug = ?", session).await;
    sqlx::query("INSERT INTO places (name, slug, kind_id, parliamentary_session_id) VALUES (?, ?, ?, ?)")
        .bind(name)
        .bind(slug)
        .bind(kind_id)
        .bind(session_id)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

pub async fn insert_organisation(pool: &SqlitePool, name: &str, slug: &str, kind: &str) -> i64 {
    let kind_id = id_of(pool, "SELECT id FROM organisation_kinds WHERE slug = ?", kind).await;
    sqlx::query("INSERT INTO organisations (name, slug, kind_id) VALUES (?, ?, ?)")
        .bind(name)
        .bind(slug)
        .bind(kind_id)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

pub async fn seed(pool: &SqlitePool) -> Seed {
    for (slug, name) in [("s2013", "Senate 2013"), ("na2013", "National Assembly 2013")] {
        sqlx::query("INSERT INTO parliamentary_sessions (slug, name) VALUES (?, ?)")
            .bind(slug)
            .bind(name)
            .execute(pool)
            .await
            .unwrap();
    }

    let nairobi_county = insert_place(pool, "Nairobi", "nairobi-county", "county", "s2013").await;
    let westlands = insert_place(pool, "Westlands", "westlands-2013", "constituency", "na2013").await;
    let kitisuru = insert_place(pool, "Kitisuru", "ward-kitisuru", "ward", "na2013").await;

    let republic = insert_organisation(pool, "REPUBLIC OF KENYA", "republic-of-kenya", "governmental").await;
    let odm = insert_organisation(pool, "Orange Democratic Movement", "odm", "party").await;
    let kanu = insert_organisation(pool, "Kenya African National Union", "kanu", "party").await;

    let title = |slug: &'static str| async move {
        id_of(pool, "SELECT id FROM position_titles WHERE slug = ?", slug).await
    };

    Seed {
        nairobi_county,
        westlands,
        kitisuru,
        republic,
        odm,
        kanu,
        governor_title: title("aspirant-governor").await,
        mp_title: title("aspirant-mp").await,
        member_title: title("member").await,
    }
}

pub async fn insert_person(pool: &SqlitePool, legal_name: &str, slug: &str) -> i64 {
    sqlx::query("INSERT INTO people (legal_name, slug) VALUES (?, ?)")
        .bind(legal_name)
        .bind(slug)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

/// Insert a position; `place_id` and `external_id` may be empty for memberships
pub async fn insert_position(
    pool: &SqlitePool,
    person_id: i64,
    organisation_id: i64,
    place_id: Option<i64>,
    title_id: i64,
    external_id: &str,
    end_date: &str,
) -> i64 {
    sqlx::query(
        r#"
        INSERT INTO positions (person_id, organisation_id, place_id, title_id, category, external_id, start_date, end_date)
        VALUES (?, ?, ?, ?, 'political', ?, '2013-01-01', ?)
        "#,
    )
    .bind(person_id)
    .bind(organisation_id)
    .bind(place_id)
    .bind(title_id)
    .bind(external_id)
    .bind(end_date)
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

pub async fn end_date_of(pool: &SqlitePool, position_id: i64) -> String {
    sqlx::query_scalar("SELECT end_date FROM positions WHERE id = ?")
        .bind(position_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn count(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}

pub fn candidate(code: &str, other_name: &str, surname: &str, contest_type: &str, party: Option<&str>) -> Candidate {
    Candidate {
        code: code.to_string(),
        other_name: Some(other_name.to_string()),
        surname: Some(surname.to_string()),
        contest_type: contest_type.to_string(),
        party: Some(Party {
            name: party.map(str::to_string),
        }),
    }
}

/// Feed serving fixed areas and candidates
#[derive(Default)]
pub struct StaticFeed {
    areas: HashMap<AreaType, Vec<Area>>,
    races: HashMap<(AreaType, String), Vec<Race>>,
    /// Area level whose listing fails as if the API were down
    unavailable: Option<AreaType>,
}

impl StaticFeed {
    /// Add an area and the candidates standing there, one race per call
    pub fn with_race(mut self, area_type: AreaType, code: &str, name: &str, candidates: Vec<Candidate>) -> Self {
        let areas = self.areas.entry(area_type).or_default();
        if !areas.iter().any(|a| a.code == code) {
            areas.push(Area {
                code: code.to_string(),
                name: name.to_string(),
            });
        }
        self.races
            .entry((area_type, code.to_string()))
            .or_default()
            .push(Race { candidates });
        self
    }

    pub fn with_unavailable(mut self, area_type: AreaType) -> Self {
        self.unavailable = Some(area_type);
        self
    }
}

impl CandidateFeed for StaticFeed {
    async fn areas(&self, area_type: AreaType) -> ImportResult<Vec<Area>> {
        if self.unavailable == Some(area_type) {
            return Err(ImportError::Api(ApiError::ApiError(503, "unavailable".into())));
        }
        Ok(self.areas.get(&area_type).cloned().unwrap_or_default())
    }

    async fn candidates(&self, area_type: AreaType, area_code: &str) -> ImportResult<Vec<Race>> {
        Ok(self
            .races
            .get(&(area_type, area_code.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Scratch data directory holding the review file
pub struct DataDir {
    pub dir: TempDir,
}

impl DataDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn review_path(&self) -> PathBuf {
        self.dir.path().join(REVIEW_FILE)
    }

    pub fn write_review_file(&self, rows: &str) {
        std::fs::write(
            self.review_path(),
            format!(
                "candidate_code,candidate_name,place_slug,race_type,person_slug,person_name,same\n{}",
                rows
            ),
        )
        .unwrap();
    }
}

pub fn settings(commit: bool) -> ImportSettings {
    ImportSettings {
        person_match_threshold: 0.92,
        create_missing_parties: true,
        today: today(),
        commit,
    }
}

pub fn importer(feed: StaticFeed, data: &DataDir, settings: ImportSettings) -> Importer<StaticFeed> {
    importer_with_corrections(feed, data, settings, Corrections::default())
}

pub fn importer_with_corrections(
    feed: StaticFeed,
    data: &DataDir,
    settings: ImportSettings,
    corrections: Corrections,
) -> Importer<StaticFeed> {
    let checker = SamePersonChecker::load(data.review_path()).unwrap();
    Importer::new(feed, RaceTable::kenya_2013(), corrections, checker, settings)
}
