//! Configuration loading and resolution
//!
//! Resolution priority (highest first):
//! 1. Command-line argument (applied by the binaries)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing config file is not an error: every section has defaults, so the
//! service starts with a warning and the compiled values.

use crate::{Error, Result};
use chrono::{FixedOffset, Weekday};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "CLUBHOUSE_CONFIG";
pub const JWT_SECRET_ENV: &str = "CLUBHOUSE_JWT_SECRET";
pub const EMAIL_API_KEY_ENV: &str = "CLUBHOUSE_EMAIL_API_KEY";
pub const PUSH_APP_ID_ENV: &str = "CLUBHOUSE_PUSH_APP_ID";
pub const PUSH_API_KEY_ENV: &str = "CLUBHOUSE_PUSH_API_KEY";
pub const BOOTSTRAP_ADMIN_ENV: &str = "CLUBHOUSE_BOOTSTRAP_ADMIN_EMAIL";

/// Minimum accepted length of the token signing secret (HS256)
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Development secret used when nothing is configured
const DEV_JWT_SECRET: &str = "clubhouse-dev-secret-change-me-before-deploying";

/// Root of the TOML configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub schedule: ScheduleConfig,
    pub notifications: NotificationConfig,
    pub email: EmailConfig,
    pub push: PushConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL of the web frontend, used in verification and reset links
    pub frontend_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file; `None` resolves to the platform data directory
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Database path, falling back to the OS-dependent default
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_database_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    /// Account promoted to admin at startup, once it has signed up
    pub bootstrap_admin_email: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            session_ttl_hours: 24,
            bootstrap_admin_email: None,
        }
    }
}

/// Weekly advance trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    /// Weekday name or abbreviation ("Mon", "monday", ...)
    pub weekday: String,
    pub hour: u32,
    pub minute: u32,
    /// Reference offset from UTC in minutes (UTC-06:00 is -360)
    pub utc_offset_minutes: i32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weekday: "Mon".to_string(),
            hour: 8,
            minute: 0,
            utc_offset_minutes: -360,
        }
    }
}

impl ScheduleConfig {
    pub fn parsed_weekday(&self) -> Result<Weekday> {
        self.weekday
            .trim()
            .parse::<Weekday>()
            .map_err(|_| Error::Config(format!("Invalid schedule weekday: '{}'", self.weekday)))
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            Error::Config(format!(
                "Invalid schedule utc_offset_minutes: {}",
                self.utc_offset_minutes
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub queue_capacity: usize,
    /// Maximum recipients per outbound email
    pub email_batch_size: usize,
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    /// Appended to every weekly reading email
    pub meeting_note: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            email_batch_size: 100,
            max_attempts: 3,
            retry_delay_secs: 30,
            meeting_note: "Join us Thursday at 8PM CST.".to_string(),
        }
    }
}

/// Outbound email API; all fields must be set to enable delivery
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from: Option<String>,
}

/// Outbound push API; `app_id` and `api_key` enable delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub api_url: String,
    pub app_id: Option<String>,
    pub api_key: Option<String>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            api_url: "https://onesignal.com/api/v1/notifications".to_string(),
            app_id: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Load configuration
    ///
    /// `explicit` (from `--config` or `CLUBHOUSE_CONFIG`) must exist. Without
    /// it the platform locations are searched and a miss yields defaults.
    /// Environment overrides are applied and the result validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match find_config_file() {
                Some(path) => Self::from_file(&path)?,
                None => {
                    warn!("No config file found, using compiled defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded config file: {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Overlay secrets and credentials from the environment
    pub fn apply_env_overrides(&mut self) {
        if let Some(secret) = env_value(JWT_SECRET_ENV) {
            self.auth.jwt_secret = secret;
        }
        if let Some(email) = env_value(BOOTSTRAP_ADMIN_ENV) {
            self.auth.bootstrap_admin_email = Some(email);
        }
        if let Some(key) = env_value(EMAIL_API_KEY_ENV) {
            self.email.api_key = Some(key);
        }
        if let Some(app_id) = env_value(PUSH_APP_ID_ENV) {
            self.push.app_id = Some(app_id);
        }
        if let Some(key) = env_value(PUSH_API_KEY_ENV) {
            self.push.api_key = Some(key);
        }
    }

    /// True while tokens are signed with the public development secret
    pub fn uses_dev_jwt_secret(&self) -> bool {
        self.auth.jwt_secret == DEV_JWT_SECRET
    }

    pub fn validate(&self) -> Result<()> {
        self.schedule.parsed_weekday()?;
        self.schedule.offset()?;
        if self.schedule.hour >= 24 {
            return Err(Error::Config(format!(
                "Invalid schedule hour: {}",
                self.schedule.hour
            )));
        }
        if self.schedule.minute >= 60 {
            return Err(Error::Config(format!(
                "Invalid schedule minute: {}",
                self.schedule.minute
            )));
        }

        let n = &self.notifications;
        if n.queue_capacity == 0 || n.email_batch_size == 0 || n.max_attempts == 0 {
            return Err(Error::Config(
                "notifications.queue_capacity, email_batch_size and max_attempts must be > 0"
                    .to_string(),
            ));
        }

        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(Error::Config(format!(
                "auth.jwt_secret must be at least {} characters",
                MIN_JWT_SECRET_LEN
            )));
        }
        if self.uses_dev_jwt_secret() {
            warn!("Using the built-in development JWT secret; set {} in production", JWT_SECRET_ENV);
        }
        if self.auth.session_ttl_hours <= 0 {
            return Err(Error::Config("auth.session_ttl_hours must be > 0".to_string()));
        }

        Ok(())
    }
}

/// Config file path from the environment, if set
pub fn config_path_from_env() -> Option<PathBuf> {
    env_value(CONFIG_PATH_ENV).map(PathBuf::from)
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Search `<config dir>/clubhouse/config.toml`, then `/etc/clubhouse/config.toml`
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("clubhouse").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/clubhouse/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("clubhouse"))
        .unwrap_or_else(|| PathBuf::from("./clubhouse_data"))
        .join("clubhouse.db")
}
