//! Unit tests for configuration loading and graceful degradation
//!
//! Note: Uses serial_test to prevent ENV variable race conditions.
//! Tests that manipulate CLUBHOUSE_* variables are marked with #[serial].

use clubhouse_common::config::{
    default_database_path, TomlConfig, BOOTSTRAP_ADMIN_ENV, EMAIL_API_KEY_ENV, JWT_SECRET_ENV,
    PUSH_API_KEY_ENV, PUSH_APP_ID_ENV,
};
use clubhouse_common::Error;
use chrono::Weekday;
use serial_test::serial;
use std::env;
use std::io::Write;

fn clear_env() {
    env::remove_var(JWT_SECRET_ENV);
    env::remove_var(EMAIL_API_KEY_ENV);
    env::remove_var(PUSH_APP_ID_ENV);
    env::remove_var(PUSH_API_KEY_ENV);
    env::remove_var(BOOTSTRAP_ADMIN_ENV);
}

#[test]
fn test_defaults_are_valid() {
    let config = TomlConfig::default();
    assert!(config.validate().is_ok());

    assert_eq!(config.server.port, 3001);
    assert!(config.schedule.enabled);
    assert_eq!(config.schedule.parsed_weekday().unwrap(), Weekday::Mon);
    assert_eq!(config.schedule.hour, 8);
    assert_eq!(config.schedule.offset().unwrap().local_minus_utc(), -6 * 3600);
    assert_eq!(config.notifications.max_attempts, 3);
    assert!(config.email.api_url.is_none());
    assert!(config.auth.bootstrap_admin_email.is_none());
    assert!(config.uses_dev_jwt_secret());
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        [server]
        port = 8080

        [schedule]
        weekday = "friday"
        hour = 18
        "#,
    )
    .unwrap();

    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.schedule.parsed_weekday().unwrap(), Weekday::Fri);
    assert_eq!(config.schedule.hour, 18);
    assert_eq!(config.schedule.minute, 0);
    assert_eq!(config.notifications.email_batch_size, 100);
}

#[test]
fn test_invalid_toml_is_config_error() {
    let result = TomlConfig::from_toml_str("[server\nport = ");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_validate_rejects_bad_schedule() {
    let mut config = TomlConfig::default();
    config.schedule.weekday = "Caturday".to_string();
    assert!(config.validate().is_err());

    let mut config = TomlConfig::default();
    config.schedule.hour = 24;
    assert!(config.validate().is_err());

    let mut config = TomlConfig::default();
    config.schedule.minute = 60;
    assert!(config.validate().is_err());

    let mut config = TomlConfig::default();
    config.schedule.utc_offset_minutes = 24 * 60;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_batch_size() {
    let mut config = TomlConfig::default();
    config.notifications.email_batch_size = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_short_secret() {
    let mut config = TomlConfig::default();
    config.auth.jwt_secret = "short".to_string();
    assert!(matches!(config.validate(), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_env_overrides_secrets() {
    clear_env();
    env::set_var(JWT_SECRET_ENV, "env-secret-env-secret-env-secret-0001");
    env::set_var(PUSH_APP_ID_ENV, "app-123");
    env::set_var(EMAIL_API_KEY_ENV, "   ");

    let mut config = TomlConfig::default();
    config.email.api_key = Some("from-toml".to_string());
    config.apply_env_overrides();

    assert_eq!(config.auth.jwt_secret, "env-secret-env-secret-env-secret-0001");
    assert!(!config.uses_dev_jwt_secret());
    assert_eq!(config.push.app_id.as_deref(), Some("app-123"));
    // Blank environment values do not override
    assert_eq!(config.email.api_key.as_deref(), Some("from-toml"));

    clear_env();
}

#[test]
#[serial]
fn test_load_explicit_file() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [database]
        path = "/tmp/clubhouse-config-test.db"

        [push]
        app_id = "toml-app"
        api_key = "toml-key"
        "#
    )
    .unwrap();

    let config = TomlConfig::load(Some(file.path())).unwrap();
    assert_eq!(
        config.database.resolved_path().to_string_lossy(),
        "/tmp/clubhouse-config-test.db"
    );
    assert_eq!(config.push.app_id.as_deref(), Some("toml-app"));
}

#[test]
#[serial]
fn test_bootstrap_admin_from_toml_and_env() {
    clear_env();
    let config = TomlConfig::from_toml_str(
        r#"
        [auth]
        bootstrap_admin_email = "owner@club.test"
        "#,
    )
    .unwrap();
    assert_eq!(
        config.auth.bootstrap_admin_email.as_deref(),
        Some("owner@club.test")
    );
    assert_eq!(config.auth.session_ttl_hours, 24);

    env::set_var(BOOTSTRAP_ADMIN_ENV, "env-owner@club.test");
    let mut config = config;
    config.apply_env_overrides();
    assert_eq!(
        config.auth.bootstrap_admin_email.as_deref(),
        Some("env-owner@club.test")
    );

    clear_env();
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let result = TomlConfig::load(Some(std::path::Path::new(
        "/nonexistent/clubhouse/config.toml",
    )));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_default_database_path_is_named() {
    let path = default_database_path();
    assert!(path.ends_with("clubhouse.db"));
    assert_eq!(TomlConfig::default().database.resolved_path(), path);
}
