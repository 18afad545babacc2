//! Test Helper Utilities
//!
//! Shared setup for clubhouse-server integration tests
#![allow(dead_code)]

pub mod app;
pub mod fakes;

pub use app::{body_json, json_request, request, send, TestApp, TEST_PASSWORD, TEST_SECRET};
pub use fakes::{RecordingMailer, RecordingPush};
