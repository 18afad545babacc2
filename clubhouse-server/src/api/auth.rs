//! Bearer token extractor
//!
//! Handlers that need a signed-in caller take [`AuthUser`] as an argument.
//! The token must verify against the server's signing secret and carry the
//! `session` purpose; anything else is rejected with 401 before the handler
//! runs.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use clubhouse_common::api::{bearer_token, Claims, TokenPurpose};
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

/// Claims of the authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let token = bearer_token(header)
            .ok_or_else(|| ApiError::Unauthorized("Malformed Authorization header".to_string()))?;

        let claims = state.tokens.verify(token, TokenPurpose::Session).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            ApiError::from(e)
        })?;

        Ok(AuthUser(claims))
    }
}
