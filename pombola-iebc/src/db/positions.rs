//! Position queries
//!
//! "Active" always means currently active on the run's `today`, using the
//! approximate-date predicate shared with the website.

use chrono::NaiveDate;
use pombola_common::dates::{today_db_string, CURRENTLY_ACTIVE_SQL};
use pombola_common::db::{Position, PositionTitle};
use pombola_common::ApproximateDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::ImportResult;

const POSITION_COLUMNS: &str = "id, person_id, organisation_id, place_id, title_id, category, external_id, start_date, end_date";

/// Fields of a position about to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPosition {
    pub person_id: i64,
    pub organisation_id: Option<i64>,
    pub place_id: Option<i64>,
    pub title_id: Option<i64>,
    pub category: String,
    pub external_id: String,
    pub start_date: ApproximateDate,
    pub end_date: ApproximateDate,
}

fn position_from_row(row: SqliteRow) -> ImportResult<Position> {
    let start: String = row.get("start_date");
    let end: String = row.get("end_date");

    Ok(Position {
        id: row.get("id"),
        person_id: row.get("person_id"),
        organisation_id: row.get("organisation_id"),
        place_id: row.get("place_id"),
        title_id: row.get("title_id"),
        category: row.get("category"),
        external_id: row.get("external_id"),
        start_date: ApproximateDate::from_db_str(&start)?,
        end_date: ApproximateDate::from_db_str(&end)?,
    })
}

pub async fn find_title_by_slug(conn: &mut SqliteConnection, slug: &str) -> sqlx::Result<Option<PositionTitle>> {
    let row = sqlx::query("SELECT id, name, slug FROM position_titles WHERE slug = ?")
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|row| PositionTitle {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
    }))
}

pub async fn find_title_by_name(conn: &mut SqliteConnection, name: &str) -> sqlx::Result<Option<PositionTitle>> {
    let row = sqlx::query("SELECT id, name, slug FROM position_titles WHERE name = ? ORDER BY id LIMIT 1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|row| PositionTitle {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
    }))
}

/// Active positions for a place and title, whoever holds them
pub async fn active_positions_for_place_title(
    conn: &mut SqliteConnection,
    place_id: i64,
    title_id: i64,
    today: NaiveDate,
) -> ImportResult<Vec<Position>> {
    let today = today_db_string(today);
    let sql = format!(
        "SELECT {} FROM positions WHERE place_id = ? AND title_id = ? AND {} ORDER BY id",
        POSITION_COLUMNS, CURRENTLY_ACTIVE_SQL
    );
    let rows = sqlx::query(&sql)
        .bind(place_id)
        .bind(title_id)
        .bind(&today)
        .bind(&today)
        .fetch_all(&mut *conn)
        .await?;

    rows.into_iter().map(position_from_row).collect()
}

/// Active positions matching every given attribute
pub async fn active_matching_positions(
    conn: &mut SqliteConnection,
    person_id: i64,
    organisation_id: i64,
    place_id: i64,
    title_id: i64,
    category: &str,
    today: NaiveDate,
) -> ImportResult<Vec<Position>> {
    let today = today_db_string(today);
    let sql = format!(
        r#"
        SELECT {} FROM positions
        WHERE person_id = ? AND organisation_id = ? AND place_id = ? AND title_id = ? AND category = ?
          AND {}
        ORDER BY id
        "#,
        POSITION_COLUMNS, CURRENTLY_ACTIVE_SQL
    );
    let rows = sqlx::query(&sql)
        .bind(person_id)
        .bind(organisation_id)
        .bind(place_id)
        .bind(title_id)
        .bind(category)
        .bind(&today)
        .bind(&today)
        .fetch_all(&mut *conn)
        .await?;

    rows.into_iter().map(position_from_row).collect()
}

/// Active `member` positions of a person in organisations of kind `party`
pub async fn active_party_memberships(
    conn: &mut SqliteConnection,
    person_id: i64,
    today: NaiveDate,
) -> ImportResult<Vec<Position>> {
    let today = today_db_string(today);
    let sql = format!(
        r#"
        SELECT {} FROM positions
        WHERE person_id = ?
          AND title_id IN (SELECT id FROM position_titles WHERE slug = 'member')
          AND organisation_id IN (
              SELECT o.id FROM organisations o
              JOIN organisation_kinds k ON k.id = o.kind_id
              WHERE k.slug = 'party'
          )
          AND {}
        ORDER BY id
        "#,
        POSITION_COLUMNS, CURRENTLY_ACTIVE_SQL
    );
    let rows = sqlx::query(&sql)
        .bind(person_id)
        .bind(&today)
        .bind(&today)
        .fetch_all(&mut *conn)
        .await?;

    rows.into_iter().map(position_from_row).collect()
}

pub async fn insert_position(conn: &mut SqliteConnection, position: &NewPosition) -> sqlx::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO positions (
            person_id, organisation_id, place_id, title_id, category,
            external_id, start_date, end_date, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(position.person_id)
    .bind(position.organisation_id)
    .bind(position.place_id)
    .bind(position.title_id)
    .bind(&position.category)
    .bind(&position.external_id)
    .bind(position.start_date.to_db_string())
    .bind(position.end_date.to_db_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn set_end_date(
    conn: &mut SqliteConnection,
    position_id: i64,
    end_date: &ApproximateDate,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE positions SET end_date = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(end_date.to_db_string())
        .bind(position_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Record the external code on a position and keep it open-ended
pub async fn tag_position(conn: &mut SqliteConnection, position_id: i64, external_id: &str) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE positions SET external_id = ?, end_date = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(external_id)
    .bind(ApproximateDate::Future.to_db_string())
    .bind(position_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
