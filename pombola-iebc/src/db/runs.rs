//! Import run history

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

/// Store a finished run; returns the run id
pub async fn record_run(
    conn: &mut SqliteConnection,
    source: &str,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    committed: bool,
    summary: &serde_json::Value,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO import_runs (source, started_at, ended_at, committed, summary) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(source)
    .bind(started_at.to_rfc3339())
    .bind(ended_at.to_rfc3339())
    .bind(committed)
    .bind(summary.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}
