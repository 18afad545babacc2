//! Book-club endpoints
//!
//! The weekly advance has no route; it belongs to the scheduler.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::auth::AuthUser;
use crate::bookclub::{CurrentState, NewCycle};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// GET /bookclub/current
pub async fn current_state(State(state): State<AppState>) -> ApiResult<Json<CurrentState>> {
    Ok(Json(state.engine.current_state().await?))
}

/// POST /bookclub/new (admin)
pub async fn create_cycle(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(request): Json<NewCycle>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let id = state.engine.create_cycle(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub fn bookclub_routes() -> Router<AppState> {
    Router::new()
        .route("/bookclub/current", get(current_state))
        .route("/bookclub/new", post(create_cycle))
}
