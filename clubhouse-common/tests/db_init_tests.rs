//! Tests for database initialization
//!
//! Covers first-run creation, reopening an existing file, and the seeded
//! single-row book-club state.

use clubhouse_common::db::init::{init_database, init_memory_database, init_schema};
use sqlx::Row;

const TABLES: [&str; 6] = [
    "schema_version",
    "users",
    "skills",
    "books",
    "bookclub_cycles",
    "bookclub_state",
];

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("clubhouse.db");

    let pool = init_database(&db_path).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("clubhouse.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_tables_created() {
    let pool = init_memory_database().await.unwrap();

    for table in TABLES {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1, "table {} missing", table);
    }
}

#[tokio::test]
async fn test_schema_init_is_idempotent() {
    let pool = init_memory_database().await.unwrap();
    init_schema(&pool).await.unwrap();
    init_schema(&pool).await.unwrap();

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookclub_state")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_bookclub_state_starts_empty() {
    let pool = init_memory_database().await.unwrap();

    let row = sqlx::query("SELECT active_cycle_id FROM bookclub_state WHERE id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    let active: Option<String> = row.get("active_cycle_id");
    assert!(active.is_none());
}

#[tokio::test]
async fn test_bookclub_state_is_single_row() {
    let pool = init_memory_database().await.unwrap();

    let result = sqlx::query("INSERT INTO bookclub_state (id, active_cycle_id) VALUES (2, NULL)")
        .execute(&pool)
        .await;
    assert!(result.is_err(), "second state row must be rejected");
}

#[tokio::test]
async fn test_skills_require_existing_user() {
    let pool = init_memory_database().await.unwrap();

    let result = sqlx::query("INSERT INTO skills (user_id, skills) VALUES ('ghost', '[]')")
        .execute(&pool)
        .await;
    assert!(result.is_err(), "foreign key should reject unknown user");
}
