//! Database access layer
//!
//! Query functions grouped by table. Each takes the shared pool and returns
//! the common `Result`, so handlers and the progression engine propagate
//! storage errors with `?`.

pub mod books;
pub mod cycles;
pub mod skills;
pub mod users;

use clubhouse_common::Error;

/// Decode a JSON string array column
pub(crate) fn decode_string_list(column: &str, value: &str) -> clubhouse_common::Result<Vec<String>> {
    serde_json::from_str(value)
        .map_err(|e| Error::Internal(format!("Failed to decode {}: {}", column, e)))
}

/// Encode a string list for a JSON array column
pub(crate) fn encode_string_list(column: &str, items: &[String]) -> clubhouse_common::Result<String> {
    serde_json::to_string(items)
        .map_err(|e| Error::Internal(format!("Failed to encode {}: {}", column, e)))
}

/// True when `err` is a UNIQUE constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
