//! # Clubhouse Common Library
//!
//! Shared code for the Clubhouse service and its tools:
//! - Database schema initialization and row models
//! - Token and password primitives
//! - Shared API response types
//! - Configuration loading
//! - Timestamp and week-key utilities

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
