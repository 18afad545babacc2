//! Admin user management
//!
//! Role changes are read from the token, so a promoted member has to log in
//! again before the new role takes effect.

use axum::{
    extract::{Path, State},
    routing::{delete, get, put},
    Json, Router,
};
use clubhouse_common::api::{require_admin, MessageResponse};
use clubhouse_common::db::{PublicUser, Role};
use clubhouse_common::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::auth::AuthUser;
use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /admin/users
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<Vec<PublicUser>>> {
    require_admin(&claims)?;
    let all = users::list_users(&state.db).await?;
    Ok(Json(all.iter().map(|u| u.public_view()).collect()))
}

/// PUT /admin/users/:id/promote
pub async fn promote_user(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<PublicUser>> {
    require_admin(&claims)?;
    users::set_role(&state.db, &id, Role::Admin).await?;

    let user = users::get_user(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    info!(user_id = %user.id, admin = %claims.sub, "User promoted to admin");
    Ok(Json(user.public_view()))
}

/// DELETE /admin/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    require_admin(&claims)?;
    if id == claims.sub {
        return Err(ApiError::BadRequest(
            "Admins cannot delete their own account".to_string(),
        ));
    }

    users::delete_user(&state.db, &id).await?;
    info!(user_id = %id, admin = %claims.sub, "User deleted");
    Ok(Json(MessageResponse::new("User deleted")))
}

/// Promote the configured bootstrap account, if it has signed up
///
/// Runs at startup. Returns whether an account was promoted; a missing
/// account is retried on the next start.
pub async fn bootstrap_admin(db: &SqlitePool, email: Option<&str>) -> Result<bool> {
    let Some(email) = email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty()) else {
        return Ok(false);
    };

    let promoted = users::promote_by_email(db, &email).await?;
    if promoted {
        info!(email = %email, "Bootstrap admin granted");
    } else {
        warn!(email = %email, "Bootstrap admin has not signed up yet");
    }
    Ok(promoted)
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id/promote", put(promote_user))
        .route("/admin/users/:id", delete(delete_user))
}
