//! Book catalog and vote counter

use chrono::Utc;
use clubhouse_common::db::{Book, Genre};
use clubhouse_common::time::{parse_db_timestamp, to_db_timestamp};
use clubhouse_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub published_year: Option<i32>,
}

const BOOK_COLUMNS: &str = "id, title, author, published_year, genre, votes, read_count, created_at";

fn book_from_row(row: &SqliteRow) -> Result<Book> {
    let genre: String = row.get("genre");
    let created_at: String = row.get("created_at");

    Ok(Book {
        id: row.get("id"),
        title: row.get("title"),
        author: row.get("author"),
        published_year: row.get("published_year"),
        genre: genre.parse()?,
        votes: row.get("votes"),
        read_count: row.get("read_count"),
        created_at: parse_db_timestamp(&created_at)?,
    })
}

pub async fn insert_book(pool: &SqlitePool, book: NewBook) -> Result<Book> {
    let id = Uuid::new_v4().to_string();

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO books (id, title, author, published_year, genre, votes, read_count, created_at)
        VALUES (?, ?, ?, ?, ?, 0, 0, ?)
        RETURNING {}
        "#,
        BOOK_COLUMNS
    ))
    .bind(&id)
    .bind(&book.title)
    .bind(&book.author)
    .bind(book.published_year)
    .bind(book.genre.as_str())
    .bind(to_db_timestamp(&Utc::now()))
    .fetch_one(pool)
    .await?;

    book_from_row(&row)
}

/// All books in insertion order
pub async fn list_books(pool: &SqlitePool) -> Result<Vec<Book>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM books ORDER BY created_at, rowid",
        BOOK_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(book_from_row).collect()
}

/// Add one vote in place and return the updated record
pub async fn increment_vote(pool: &SqlitePool, book_id: &str) -> Result<Book> {
    let row = sqlx::query(&format!(
        "UPDATE books SET votes = votes + 1 WHERE id = ? RETURNING {}",
        BOOK_COLUMNS
    ))
    .bind(book_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => book_from_row(&row),
        None => Err(Error::NotFound(format!("Book {}", book_id))),
    }
}

/// Most-voted book; ties go to the earliest inserted
pub async fn book_of_the_month(pool: &SqlitePool) -> Result<Option<Book>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM books ORDER BY votes DESC, created_at ASC, rowid ASC LIMIT 1",
        BOOK_COLUMNS
    ))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(book_from_row).transpose()
}
