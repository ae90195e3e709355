//! Place, place kind and parliamentary session lookups

use pombola_common::db::{ParliamentarySession, Place, PlaceKind};
use sqlx::{Row, SqliteConnection};

pub async fn find_place_kind(conn: &mut SqliteConnection, slug: &str) -> sqlx::Result<Option<PlaceKind>> {
    let row = sqlx::query("SELECT id, slug, name FROM place_kinds WHERE slug = ?")
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|row| PlaceKind {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
    }))
}

pub async fn find_session(
    conn: &mut SqliteConnection,
    slug: &str,
) -> sqlx::Result<Option<ParliamentarySession>> {
    let row = sqlx::query("SELECT id, slug, name FROM parliamentary_sessions WHERE slug = ?")
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|row| ParliamentarySession {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
    }))
}

/// The place with this slug, kind and session (unique together)
pub async fn find_place(
    conn: &mut SqliteConnection,
    slug: &str,
    kind_id: i64,
    session_id: i64,
) -> sqlx::Result<Option<Place>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, slug, kind_id, parliamentary_session_id
        FROM places
        WHERE slug = ? AND kind_id = ? AND parliamentary_session_id = ?
        "#,
    )
    .bind(slug)
    .bind(kind_id)
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|row| Place {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        kind_id: row.get("kind_id"),
        parliamentary_session_id: row.get("parliamentary_session_id"),
    }))
}
