//! Account endpoints: signup, verification, login, password reset, lookup

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use clubhouse_common::api::{hash_password, verify_password, MessageResponse, TokenPurpose};
use clubhouse_common::db::{PublicUser, Role};
use clubhouse_common::Error;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::users::{self, NewUser};
use crate::error::{ApiError, ApiResult};
use crate::notify::EmailMessage;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct NewPasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: LoginUser,
    pub token: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn link_email(to: &str, subject: &str, intro: &str, link: &str) -> EmailMessage {
    EmailMessage {
        to: vec![to.to_string()],
        subject: subject.to_string(),
        text: format!("{}\n\n{}", intro, link),
        html: format!(
            "<p>{}</p><p><a href=\"{}\">{}</a></p>",
            html_escape::encode_text(intro),
            html_escape::encode_double_quoted_attribute(link),
            html_escape::encode_text(link)
        ),
    }
}

/// POST /signup
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let name = request.name.trim();
    let email = normalize_email(&request.email);
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    if !email.contains('@') {
        return Err(ApiError::BadRequest("a valid email is required".to_string()));
    }
    if request.password.trim().is_empty() {
        return Err(ApiError::BadRequest("password is required".to_string()));
    }

    let user = users::create_user(
        &state.db,
        NewUser {
            name: name.to_string(),
            email,
            phone: request
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            password_hash: hash_password(&request.password)?,
            role: Role::User,
        },
    )
    .await?;

    info!(user_id = %user.id, "User registered");

    let token = state
        .tokens
        .issue(&user.id, &user.email, user.role, TokenPurpose::VerifyEmail)?;
    let link = format!("{}/verify-email/{}", state.frontend_url, token);
    let message = link_email(
        &user.email,
        "Verify your email",
        "Please verify your email address by opening this link:",
        &link,
    );

    // Account stays usable for a later resend
    if let Err(e) = state.mailer.send(&message).await {
        warn!(user_id = %user.id, error = %e, "Verification email not sent");
    }

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "User registered. Please check your email to verify your account.",
        )),
    ))
}

/// GET /verify-email/:token
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let claims = state
        .tokens
        .verify(&token, TokenPurpose::VerifyEmail)
        .map_err(|e| ApiError::BadRequest(format!("Invalid verification link: {}", e)))?;

    let user = users::get_user(&state.db, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if user.is_verified {
        return Ok(Json(MessageResponse::new("Email already verified")));
    }

    users::mark_verified(&state.db, &user.id).await?;
    info!(user_id = %user.id, "Email verified");
    Ok(Json(MessageResponse::new("Email verified successfully")))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let email = normalize_email(&request.email);
    let user = users::get_user_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !user.is_verified {
        return Err(ApiError::Unauthorized(
            "Please verify your email before logging in".to_string(),
        ));
    }
    if !verify_password(&request.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = state
        .tokens
        .issue(&user.id, &user.email, user.role, TokenPurpose::Session)?;

    info!(user_id = %user.id, "User logged in");
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user: LoginUser {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        },
        token,
    }))
}

/// POST /reset-password
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = normalize_email(&request.email);
    let user = users::get_user_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let token = state
        .tokens
        .issue(&user.id, &user.email, user.role, TokenPurpose::PasswordReset)?;
    let expiry = Utc::now() + TokenPurpose::PasswordReset.default_ttl();
    users::set_reset_token(&state.db, &user.id, &token, expiry).await?;

    let link = format!("{}/reset-password/{}", state.frontend_url, token);
    let message = link_email(
        &user.email,
        "Password reset",
        "You requested a password reset. This link expires in 15 minutes:",
        &link,
    );
    state
        .mailer
        .send(&message)
        .await
        .map_err(|e| Error::Dispatch(format!("Password reset email: {}", e)))?;

    info!(user_id = %user.id, "Password reset requested");
    Ok(Json(MessageResponse::new("Password reset email sent")))
}

/// POST /reset-password/:token
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<NewPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if request.password.trim().is_empty() {
        return Err(ApiError::BadRequest("password is required".to_string()));
    }

    let invalid = || ApiError::BadRequest("Invalid or expired reset token".to_string());

    let claims = state
        .tokens
        .verify(&token, TokenPurpose::PasswordReset)
        .map_err(|_| invalid())?;

    let user = users::get_user(&state.db, &claims.sub)
        .await?
        .ok_or_else(invalid)?;

    let matches_stored = user.reset_token.as_deref() == Some(token.as_str());
    let unexpired = user.reset_token_expiry.is_some_and(|expiry| expiry > Utc::now());
    if !matches_stored || !unexpired {
        return Err(invalid());
    }

    users::update_password(&state.db, &user.id, &hash_password(&request.password)?).await?;
    info!(user_id = %user.id, "Password reset completed");
    Ok(Json(MessageResponse::new("Password has been reset")))
}

/// GET /search?query=
pub async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<PublicUser>>> {
    let query = params.query.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let found = users::search_users(&state.db, query).await?;
    Ok(Json(found.iter().map(|u| u.public_view()).collect()))
}

/// GET /users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PublicUser>> {
    users::get_user(&state.db, &id)
        .await?
        .map(|u| Json(u.public_view()))
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/verify-email/:token", get(verify_email))
        .route("/login", post(login))
        .route("/reset-password", post(request_password_reset))
        .route("/reset-password/:token", post(confirm_password_reset))
        .route("/search", get(search_users))
        .route("/users/:id", get(get_user))
}
