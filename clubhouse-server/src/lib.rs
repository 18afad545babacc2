//! clubhouse-server library
//!
//! Community club service: accounts, skill profiles, the book catalog with
//! voting, and the book-club cycle whose week advances on a weekly schedule
//! and notifies every member.

use axum::Router;
use clubhouse_common::api::TokenSigner;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod api;
pub mod bookclub;
pub mod db;
pub mod error;
pub mod logging;
pub mod notify;
pub mod scheduler;

use bookclub::ProgressionEngine;
use notify::Mailer;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Signs and verifies session, verification and reset tokens
    pub tokens: TokenSigner,
    pub engine: Arc<ProgressionEngine>,
    /// Account emails (verification, password reset)
    pub mailer: Arc<dyn Mailer>,
    /// Base URL for links in account emails, without trailing slash
    pub frontend_url: String,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        tokens: TokenSigner,
        engine: Arc<ProgressionEngine>,
        mailer: Arc<dyn Mailer>,
        frontend_url: impl Into<String>,
    ) -> Self {
        let frontend_url: String = frontend_url.into();
        Self {
            db,
            tokens,
            engine,
            mailer,
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::bookclub_routes())
        .merge(api::book_routes())
        .merge(api::skill_routes())
        .merge(api::account_routes())
        .merge(api::admin_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
