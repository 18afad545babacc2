//! Skill profile endpoints

use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use clubhouse_common::api::require_owner_or_admin;
use clubhouse_common::db::SkillProfile;
use serde::Deserialize;

use super::auth::AuthUser;
use crate::db::{skills, users};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AddSkillRequest {
    pub skill: String,
}

/// GET /skills/:userId
pub async fn get_skills(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<SkillProfile>> {
    Ok(Json(skills::get_profile(&state.db, &user_id).await?))
}

/// POST /skills/:userId (owner or admin)
pub async fn add_skill(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(user_id): Path<String>,
    Json(request): Json<AddSkillRequest>,
) -> ApiResult<Json<SkillProfile>> {
    require_owner_or_admin(&claims, &user_id)?;

    let skill = request.skill.trim();
    if skill.is_empty() {
        return Err(ApiError::BadRequest("skill is required".to_string()));
    }
    if !users::user_exists(&state.db, &user_id).await? {
        return Err(ApiError::NotFound(format!("User {}", user_id)));
    }

    Ok(Json(skills::add_skill(&state.db, &user_id, skill).await?))
}

/// DELETE /skills/:userId/:skill (owner or admin)
pub async fn remove_skill(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path((user_id, skill)): Path<(String, String)>,
) -> ApiResult<Json<SkillProfile>> {
    require_owner_or_admin(&claims, &user_id)?;
    Ok(Json(skills::remove_skill(&state.db, &user_id, &skill).await?))
}

pub fn skill_routes() -> Router<AppState> {
    Router::new()
        .route("/skills/:user_id", get(get_skills).post(add_skill))
        .route("/skills/:user_id/:skill", delete(remove_skill))
}
