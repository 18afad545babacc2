//! Book catalog and voting endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use clubhouse_common::api::require_admin;
use clubhouse_common::db::{Book, Genre};
use serde::Deserialize;
use tracing::info;

use super::auth::AuthUser;
use crate::db::books::{self, NewBook};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBookRequest {
    pub title: String,
    pub author: String,
    pub genre: String,
    #[serde(default)]
    pub published_year: Option<i32>,
}

/// POST /vote/:bookId
///
/// Any signed-in member; repeat votes are counted.
pub async fn vote(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(book_id): Path<String>,
) -> ApiResult<Json<Book>> {
    let book = books::increment_vote(&state.db, &book_id).await?;
    info!(book_id = %book.id, votes = book.votes, user = %claims.sub, "Vote recorded");
    Ok(Json(book))
}

/// GET /books
pub async fn list_books(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> ApiResult<Json<Vec<Book>>> {
    Ok(Json(books::list_books(&state.db).await?))
}

/// GET /books/of-the-month
pub async fn book_of_the_month(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> ApiResult<Json<Book>> {
    books::book_of_the_month(&state.db)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No books in the catalog".to_string()))
}

/// POST /books (admin)
pub async fn add_book(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(request): Json<AddBookRequest>,
) -> ApiResult<(StatusCode, Json<Book>)> {
    require_admin(&claims)?;

    let title = request.title.trim();
    let author = request.author.trim();
    if title.is_empty() || author.is_empty() {
        return Err(ApiError::BadRequest("title and author are required".to_string()));
    }
    let genre: Genre = request.genre.trim().parse()?;

    let book = books::insert_book(
        &state.db,
        NewBook {
            title: title.to_string(),
            author: author.to_string(),
            genre,
            published_year: request.published_year,
        },
    )
    .await?;

    info!(book_id = %book.id, title = %book.title, "Book added");
    Ok((StatusCode::CREATED, Json(book)))
}

pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/vote/:book_id", post(vote))
        .route("/books", get(list_books).post(add_book))
        .route("/books/of-the-month", get(book_of_the_month))
}
