//! Application configuration loaded from environment variables.

use std::time::Duration;

use serde::Deserialize;
use strum::{Display, EnumString};

use crate::error::AppError;

/// Deployment environment reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// Local development.
    #[default]
    Development,
    /// Production deployment.
    Production,
    /// Test runs.
    Test,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Server Configuration ===
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Environment name shown in the health payload.
    #[serde(default)]
    pub environment: Environment,

    /// Start with the three demo todos.
    #[serde(default = "default_true")]
    pub seed_demo_data: bool,

    // === Logging ===
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,

    // === Rate Limiting ===
    /// Requests allowed per client within one window.
    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max_requests: usize,

    /// Sliding window length in seconds.
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_secs: u64,

    /// Take the client address from the X-Forwarded-For entry appended by
    /// the proxy in front of the service (the last one).
    #[serde(default = "default_true")]
    pub trust_proxy: bool,

    // === Health Check ===
    /// Host the health-check command connects to.
    #[serde(default = "default_health_host")]
    pub health_check_host: String,

    /// Health-check request timeout in milliseconds.
    #[serde(default = "default_health_timeout")]
    pub health_check_timeout_ms: u64,

    // === Database (wait-for-db only) ===
    /// Database name.
    #[serde(default = "default_db_name")]
    pub db_name: String,

    /// Database user.
    #[serde(default = "default_db_user")]
    pub db_user: String,

    /// Database password.
    #[serde(default = "default_db_pass")]
    pub db_pass: String,

    /// Database host.
    #[serde(default = "default_db_host")]
    pub db_host: String,

    /// Database port.
    #[serde(default = "default_db_port")]
    pub db_port: u16,

    /// Connection attempts before giving up.
    #[serde(default = "default_db_wait_attempts")]
    pub db_wait_max_attempts: u32,

    /// Delay between connection attempts in milliseconds.
    #[serde(default = "default_db_wait_delay")]
    pub db_wait_delay_ms: u64,
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rate_limit_max() -> usize {
    100
}

fn default_rate_limit_window() -> u64 {
    15 * 60
}

fn default_health_host() -> String {
    "localhost".to_string()
}

fn default_health_timeout() -> u64 {
    5000
}

fn default_db_name() -> String {
    "todoapp".to_string()
}

fn default_db_user() -> String {
    "root".to_string()
}

fn default_db_pass() -> String {
    "password".to_string()
}

fn default_db_host() -> String {
    "mysql".to_string()
}

fn default_db_port() -> u16 {
    3306
}

fn default_db_wait_attempts() -> u32 {
    30
}

fn default_db_wait_delay() -> u64 {
    2000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            environment: Environment::default(),
            seed_demo_data: true,
            rust_log: default_log_level(),
            log_format: LogFormat::default(),
            rate_limit_max_requests: default_rate_limit_max(),
            rate_limit_window_secs: default_rate_limit_window(),
            trust_proxy: true,
            health_check_host: default_health_host(),
            health_check_timeout_ms: default_health_timeout(),
            db_name: default_db_name(),
            db_user: default_db_user(),
            db_pass: default_db_pass(),
            db_host: default_db_host(),
            db_port: default_db_port(),
            db_wait_max_attempts: default_db_wait_attempts(),
            db_wait_delay_ms: default_db_wait_delay(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Ok(envy::from_env()?)
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.rate_limit_max_requests == 0 {
            return Err("RATE_LIMIT_MAX_REQUESTS must be at least 1".to_string());
        }

        if self.rate_limit_window_secs == 0 {
            return Err("RATE_LIMIT_WINDOW_SECS must be at least 1".to_string());
        }

        if self.health_check_timeout_ms == 0 {
            return Err("HEALTH_CHECK_TIMEOUT_MS must be at least 1".to_string());
        }

        if self.db_wait_max_attempts == 0 {
            return Err("DB_WAIT_MAX_ATTEMPTS must be at least 1".to_string());
        }

        Ok(())
    }

    /// Validate, converting failures into [`AppError`].
    pub fn ensure_valid(&self) -> Result<(), AppError> {
        self.validate().map_err(AppError::InvalidConfig)
    }

    /// Rate limit window as a duration.
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    /// Health check timeout as a duration.
    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }

    /// Delay between database connection attempts.
    pub fn db_wait_delay(&self) -> Duration {
        Duration::from_millis(self.db_wait_delay_ms)
    }
}
