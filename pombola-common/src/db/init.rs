//! Database initialization
//!
//! Opens (creating if needed) the SQLite database and ensures the schema and
//! reference rows exist. Every step is idempotent, so it runs on each start.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // The importer runs as a single writer holding one long transaction, so a
    // small pool is enough
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;
    init_reference_data(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_parliamentary_sessions_table(pool).await?;
    create_place_kinds_table(pool).await?;
    create_places_table(pool).await?;
    create_organisation_kinds_table(pool).await?;
    create_organisations_table(pool).await?;
    create_people_table(pool).await?;
    create_position_titles_table(pool).await?;
    create_positions_table(pool).await?;
    create_import_runs_table(pool).await?;
    Ok(())
}

pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_parliamentary_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parliamentary_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slug TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            start_date TEXT NOT NULL DEFAULT '',
            end_date TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_place_kinds_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS place_kinds (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slug TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_places_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS places (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            kind_id INTEGER NOT NULL REFERENCES place_kinds(id),
            parliamentary_session_id INTEGER REFERENCES parliamentary_sessions(id),
            UNIQUE (slug, kind_id, parliamentary_session_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_places_slug ON places(slug)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_organisation_kinds_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS organisation_kinds (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slug TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_organisations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS organisations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            kind_id INTEGER NOT NULL REFERENCES organisation_kinds(id),
            started TEXT NOT NULL DEFAULT '',
            ended TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_people_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS people (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            legal_name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_position_titles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS position_titles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_positions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS positions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            person_id INTEGER NOT NULL REFERENCES people(id) ON DELETE CASCADE,
            organisation_id INTEGER REFERENCES organisations(id),
            place_id INTEGER REFERENCES places(id),
            title_id INTEGER REFERENCES position_titles(id),
            category TEXT NOT NULL DEFAULT 'other',
            external_id TEXT NOT NULL DEFAULT '',
            start_date TEXT NOT NULL DEFAULT '',
            end_date TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_positions_place_title ON positions(place_id, title_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_positions_person ON positions(person_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_import_runs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            started_at TEXT NOT NULL,
            ended_at TEXT NOT NULL,
            committed INTEGER NOT NULL DEFAULT 0,
            summary TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Kinds and titles the aspirant import relies on
const PLACE_KINDS: &[(&str, &str)] = &[
    ("county", "County"),
    ("constituency", "Constituency"),
    ("ward", "Ward"),
];

const ORGANISATION_KINDS: &[(&str, &str)] = &[
    ("party", "Political Party"),
    ("governmental", "Governmental"),
];

const POSITION_TITLES: &[(&str, &str)] = &[
    ("member", "Member"),
    ("aspirant-governor", "Aspirant Governor"),
    ("aspirant-senator", "Aspirant Senator"),
    ("aspirant-women-representative", "Aspirant Women Representative"),
    ("aspirant-mp", "Aspirant MP"),
    ("aspirant-ward-representative", "Aspirant Ward Representative"),
];

/// Insert reference rows that are missing; existing rows are left untouched
pub async fn init_reference_data(pool: &SqlitePool) -> Result<()> {
    for (slug, name) in PLACE_KINDS {
        sqlx::query("INSERT OR IGNORE INTO place_kinds (slug, name) VALUES (?, ?)")
            .bind(slug)
            .bind(name)
            .execute(pool)
            .await?;
    }

    for (slug, name) in ORGANISATION_KINDS {
        sqlx::query("INSERT OR IGNORE INTO organisation_kinds (slug, name) VALUES (?, ?)")
            .bind(slug)
            .bind(name)
            .execute(pool)
            .await?;
    }

    for (slug, name) in POSITION_TITLES {
        sqlx::query("INSERT OR IGNORE INTO position_titles (slug, name) VALUES (?, ?)")
            .bind(slug)
            .bind(name)
            .execute(pool)
            .await?;
    }

    Ok(())
}
