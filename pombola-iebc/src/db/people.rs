//! Person queries

use pombola_common::db::Person;
use pombola_common::with_numeric_suffix;
use sqlx::{Row, SqliteConnection};

/// Every person, for in-memory name matching
pub async fn all_people(conn: &mut SqliteConnection) -> sqlx::Result<Vec<Person>> {
    let rows = sqlx::query("SELECT id, legal_name, slug FROM people ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| Person {
            id: row.get("id"),
            legal_name: row.get("legal_name"),
            slug: row.get("slug"),
        })
        .collect())
}

/// First free slug among `base`, `base-2`, `base-3`, ...
pub async fn unique_slug(conn: &mut SqliteConnection, base: &str) -> sqlx::Result<String> {
    let mut slug = base.to_string();
    let mut suffix = 2;
    while slug_exists(conn, &slug).await? {
        slug = with_numeric_suffix(&slug, suffix);
        suffix += 1;
    }
    Ok(slug)
}

pub async fn slug_exists(conn: &mut SqliteConnection, slug: &str) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM people WHERE slug = ?")
        .bind(slug)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

pub async fn insert_person(conn: &mut SqliteConnection, legal_name: &str, slug: &str) -> sqlx::Result<Person> {
    let id = sqlx::query(
        "INSERT INTO people (legal_name, slug, created_at, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
    )
    .bind(legal_name)
    .bind(slug)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(Person {
        id,
        legal_name: legal_name.to_string(),
        slug: slug.to_string(),
    })
}
