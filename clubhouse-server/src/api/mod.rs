//! HTTP API handlers

pub mod accounts;
pub mod admin;
pub mod auth;
pub mod bookclub;
pub mod books;
pub mod health;
pub mod skills;

pub use accounts::account_routes;
pub use admin::admin_routes;
pub use auth::AuthUser;
pub use bookclub::bookclub_routes;
pub use books::book_routes;
pub use health::health_routes;
pub use skills::skill_routes;
