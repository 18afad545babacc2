//! API module for shared HTTP API functionality
//!
//! Provides token, password and response types used by the server handlers
//! and the command-line tools.
//!
//! This module contains ONLY pure functions and shared types; the axum
//! extractors that wrap them live in the server crate.

pub mod auth;
pub mod types;

pub use auth::{
    bearer_token, hash_password, require_admin, require_owner_or_admin, verify_password, Claims,
    TokenPurpose, TokenSigner,
};
pub use types::{ErrorBody, ErrorResponse, MessageResponse};
