//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub reservations: ReservationConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Isolation level every reservation transaction starts with
    #[serde(default)]
    pub isolation_level: IsolationLevel,

    /// Apply embedded migrations at startup
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    2
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

/// Transaction isolation level
///
/// Spot claims rely on the store to reject a second writer, so anything weaker
/// than `RepeatableRead` is not offered.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    RepeatableRead,
    #[default]
    Serializable,
}

impl IsolationLevel {
    /// SQL fragment for `SET TRANSACTION ISOLATION LEVEL ...`
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Reservation policy configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ReservationConfig {
    /// Hold duration used when a request does not specify one
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: i64,

    /// Longest hold a caller may request
    #[serde(default = "default_max_duration_minutes")]
    pub max_duration_minutes: i64,

    /// Hourly rate applied when a reservation turns into an occupancy session
    #[serde(default = "default_hourly_rate")]
    pub hourly_rate: f64,

    /// Per-garage hourly rate overrides, keyed by garage id
    #[serde(default)]
    pub garage_rates: HashMap<String, f64>,
}

fn default_duration_minutes() -> i64 {
    30
}

fn default_max_duration_minutes() -> i64 {
    1440 // 24 hours
}

fn default_hourly_rate() -> f64 {
    5.00
}

/// Periodic cleanup configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CleanupConfig {
    /// Run the expiry pass in the background
    #[serde(default = "default_cleanup_enabled")]
    pub enabled: bool,

    /// Seconds between expiry passes
    #[serde(default = "default_cleanup_interval")]
    pub interval_secs: u64,
}

fn default_cleanup_enabled() -> bool {
    true
}

fn default_cleanup_interval() -> u64 {
    60
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default level for the workspace crates when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.isolation_level", "serializable")?
            .set_default("reservations.default_duration_minutes", 30)?
            .set_default("reservations.max_duration_minutes", 1440)?
            .set_default("reservations.hourly_rate", 5.00)?
            .set_default("cleanup.enabled", true)?
            .set_default("cleanup.interval_secs", 60)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with PARKING_ prefix
            .add_source(
                Environment::with_prefix("PARKING")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: default_duration_minutes(),
            max_duration_minutes: default_max_duration_minutes(),
            hourly_rate: default_hourly_rate(),
            garage_rates: HashMap::new(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: default_cleanup_enabled(),
            interval_secs: default_cleanup_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
