//! Book-club cycle persistence
//!
//! The active cycle is the one named by `bookclub_state.active_cycle_id`.
//! Inserting a cycle and repointing the state row happen in one
//! transaction, and advancing is a compare-and-set on `current_week`.

use chrono::{DateTime, Utc};
use clubhouse_common::db::BookClubCycle;
use clubhouse_common::time::{parse_db_timestamp, to_db_timestamp};
use clubhouse_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{decode_string_list, encode_string_list};

/// Validated input for a new cycle
#[derive(Debug, Clone)]
pub struct NewCycleRecord {
    pub title: String,
    pub author: String,
    pub cover_image_ref: Option<String>,
    pub audio_edition_ref: Option<String>,
    pub chapter_plan: Vec<String>,
}

const CYCLE_COLUMNS: &str = "c.id, c.title, c.author, c.cover_image_ref, c.audio_edition_ref, \
     c.chapter_plan, c.current_week, c.start_date, c.updated_at, c.last_advanced_week";

fn cycle_from_row(row: &SqliteRow) -> Result<BookClubCycle> {
    let plan: String = row.get("chapter_plan");
    let current_week: i64 = row.get("current_week");
    let start_date: String = row.get("start_date");
    let updated_at: String = row.get("updated_at");

    Ok(BookClubCycle {
        id: row.get("id"),
        title: row.get("title"),
        author: row.get("author"),
        cover_image_ref: row.get("cover_image_ref"),
        audio_edition_ref: row.get("audio_edition_ref"),
        chapter_plan: decode_string_list("chapter_plan", &plan)?,
        current_week: u32::try_from(current_week)
            .map_err(|_| Error::Internal(format!("Invalid current_week {}", current_week)))?,
        start_date: parse_db_timestamp(&start_date)?,
        updated_at: parse_db_timestamp(&updated_at)?,
        last_advanced_week: row.get("last_advanced_week"),
    })
}

/// Insert a cycle at week 0 and make it the active one
pub async fn insert_cycle(
    pool: &SqlitePool,
    cycle: NewCycleRecord,
    now: DateTime<Utc>,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    let now = to_db_timestamp(&now);

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO bookclub_cycles
            (id, title, author, cover_image_ref, audio_edition_ref, chapter_plan,
             current_week, start_date, updated_at, last_advanced_week)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, NULL)
        "#,
    )
    .bind(&id)
    .bind(&cycle.title)
    .bind(&cycle.author)
    .bind(&cycle.cover_image_ref)
    .bind(&cycle.audio_edition_ref)
    .bind(encode_string_list("chapter_plan", &cycle.chapter_plan)?)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE bookclub_state SET active_cycle_id = ? WHERE id = 1")
        .bind(&id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(id)
}

pub async fn load_active(pool: &SqlitePool) -> Result<Option<BookClubCycle>> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {} FROM bookclub_state s
        JOIN bookclub_cycles c ON c.id = s.active_cycle_id
        WHERE s.id = 1
        "#,
        CYCLE_COLUMNS
    ))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(cycle_from_row).transpose()
}

pub async fn get_cycle(pool: &SqlitePool, id: &str) -> Result<Option<BookClubCycle>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM bookclub_cycles c WHERE c.id = ?",
        CYCLE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(cycle_from_row).transpose()
}

/// Move `id` from `expected_week` to `expected_week + 1`
///
/// Returns false when another writer changed the row first or the plan is
/// already exhausted.
pub async fn advance(
    pool: &SqlitePool,
    id: &str,
    expected_week: u32,
    week_key: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE bookclub_cycles
        SET current_week = current_week + 1,
            updated_at = ?,
            last_advanced_week = ?
        WHERE id = ?
          AND current_week = ?
          AND current_week < json_array_length(chapter_plan)
        "#,
    )
    .bind(to_db_timestamp(&now))
    .bind(week_key)
    .bind(id)
    .bind(i64::from(expected_week))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
