//! Settings table accessors (key-value)

use crate::{Error, Result};
use sqlx::SqliteConnection;
use std::str::FromStr;

/// Key holding the timestamp of the last committed aspirant import
pub const LAST_ASPIRANT_IMPORT_KEY: &str = "last_aspirant_import_at";

/// Get a setting, parsed into `T`; `None` when unset
pub async fn get_setting<T>(conn: &mut SqliteConnection, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value: Option<Option<String>> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?;

    match value.flatten() {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::InvalidInput(format!("Setting '{}' = '{}': {}", key, raw, e))),
        None => Ok(None),
    }
}

/// Insert or replace a setting
pub async fn set_setting<T: ToString>(conn: &mut SqliteConnection, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(())
}
