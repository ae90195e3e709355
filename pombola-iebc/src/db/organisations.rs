//! Organisation lookups and party creation

use pombola_common::db::Organisation;
use pombola_common::{with_numeric_suffix, ApproximateDate};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

fn organisation_from_row(row: SqliteRow) -> Organisation {
    Organisation {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        kind_id: row.get("kind_id"),
    }
}

pub async fn find_organisation_kind_id(
    conn: &mut SqliteConnection,
    slug: &str,
) -> sqlx::Result<Option<i64>> {
    sqlx::query_scalar("SELECT id FROM organisation_kinds WHERE slug = ?")
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await
}

/// Organisation with exactly this name
pub async fn find_organisation_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> sqlx::Result<Option<Organisation>> {
    let row = sqlx::query("SELECT id, name, slug, kind_id FROM organisations WHERE name = ? ORDER BY id LIMIT 1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(organisation_from_row))
}

/// Organisations of a kind whose name equals `name`, ignoring case
pub async fn find_by_name_iexact(
    conn: &mut SqliteConnection,
    kind_id: i64,
    name: &str,
) -> sqlx::Result<Vec<Organisation>> {
    let rows = sqlx::query(
        "SELECT id, name, slug, kind_id FROM organisations WHERE kind_id = ? AND lower(name) = lower(?) ORDER BY id",
    )
    .bind(kind_id)
    .bind(name)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(organisation_from_row).collect())
}

/// Organisations of a kind whose name starts with `prefix`, ignoring case
pub async fn find_by_name_istartswith(
    conn: &mut SqliteConnection,
    kind_id: i64,
    prefix: &str,
) -> sqlx::Result<Vec<Organisation>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, slug, kind_id FROM organisations
        WHERE kind_id = ? AND substr(lower(name), 1, length(?)) = lower(?)
        ORDER BY id
        "#,
    )
    .bind(kind_id)
    .bind(prefix)
    .bind(prefix)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(organisation_from_row).collect())
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
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM organisations WHERE slug = ?")
        .bind(slug)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

pub async fn insert_organisation(
    conn: &mut SqliteConnection,
    name: &str,
    slug: &str,
    kind_id: i64,
    started: &ApproximateDate,
) -> sqlx::Result<Organisation> {
    let id = sqlx::query(
        "INSERT INTO organisations (name, slug, kind_id, started, ended) VALUES (?, ?, ?, ?, '')",
    )
    .bind(name)
    .bind(slug)
    .bind(kind_id)
    .bind(started.to_db_string())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(Organisation {
        id,
        name: name.to_string(),
        slug: slug.to_string(),
        kind_id,
    })
}
