//! In-memory application harness

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::FixedOffset;
use clubhouse_common::api::{hash_password, TokenPurpose, TokenSigner};
use clubhouse_common::db::{init_memory_database, Role, User};
use clubhouse_server::bookclub::ProgressionEngine;
use clubhouse_server::db::users::{self, NewUser};
use clubhouse_server::notify::{
    Announcement, DispatchSettings, NotificationQueue, NotificationWorker,
};
use clubhouse_server::{build_router, AppState};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower::util::ServiceExt;

use super::fakes::{RecordingMailer, RecordingPush};

pub const TEST_SECRET: &str = "test-secret-0123456789abcdef0123456789";
pub const TEST_PASSWORD: &str = "hunter2-but-longer";

pub struct TestApp {
    pub db: SqlitePool,
    pub tokens: TokenSigner,
    pub engine: Arc<ProgressionEngine>,
    pub mailer: Arc<RecordingMailer>,
    pub push: Arc<RecordingPush>,
    rx: Option<mpsc::Receiver<Announcement>>,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_queue_capacity(16).await
    }

    pub async fn with_queue_capacity(capacity: usize) -> Self {
        let db = init_memory_database().await.unwrap();
        let tokens = TokenSigner::new(TEST_SECRET);
        let (queue, rx) = NotificationQueue::channel(capacity);
        let cst = FixedOffset::west_opt(6 * 3600).unwrap();
        let engine = Arc::new(ProgressionEngine::new(db.clone(), queue, cst));
        let mailer = Arc::new(RecordingMailer::default());
        let push = Arc::new(RecordingPush::default());

        let state = AppState::new(
            db.clone(),
            tokens.clone(),
            engine.clone(),
            mailer.clone(),
            "http://frontend.test/",
        );

        Self {
            db,
            tokens,
            engine,
            mailer,
            push,
            rx: Some(rx),
            router: build_router(state),
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Announcements queued so far
    pub fn drain_announcements(&mut self) -> Vec<Announcement> {
        let mut out = Vec::new();
        if let Some(rx) = self.rx.as_mut() {
            while let Ok(a) = rx.try_recv() {
                out.push(a);
            }
        }
        out
    }

    /// Hand the queue receiver to a worker using the recording transports
    pub fn take_worker(&mut self, batch_size: usize, max_attempts: u32) -> NotificationWorker {
        NotificationWorker::new(
            self.rx.take().expect("worker already taken"),
            self.db.clone(),
            self.mailer.clone(),
            self.push.clone(),
            DispatchSettings {
                email_batch_size: batch_size,
                max_attempts,
                retry_delay: Duration::from_millis(1),
                meeting_note: "Join us Thursday at 8PM CST.".to_string(),
            },
        )
    }

    pub async fn insert_user(&self, name: &str, email: &str, role: Role, verified: bool) -> User {
        let user = users::create_user(
            &self.db,
            NewUser {
                name: name.to_string(),
                email: email.to_string(),
                phone: None,
                password_hash: hash_password(TEST_PASSWORD).unwrap(),
                role,
            },
        )
        .await
        .unwrap();
        if verified {
            users::mark_verified(&self.db, &user.id).await.unwrap();
        }
        user
    }

    pub fn session_token(&self, user: &User) -> String {
        self.tokens
            .issue(&user.id, &user.email, user.role, TokenPurpose::Session)
            .unwrap()
    }

    pub async fn admin(&self) -> (User, String) {
        let user = self.insert_user("Admin", "admin@club.test", Role::Admin, true).await;
        let token = self.session_token(&user);
        (user, token)
    }

    pub async fn member(&self, name: &str, email: &str) -> (User, String) {
        let user = self.insert_user(name, email, Role::User, true).await;
        let token = self.session_token(&user);
        (user, token)
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Parse a response body; non-JSON bodies read as `Null`
pub async fn body_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response.into_body()).await)
}
