//! # Lending Configuration
//!
//! Settings for the store connection, loan defaults and conflict retries.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SHELF_DATABASE_PATH=/var/lib/shelf/shelf.db                        │
//! │     SHELF_LOAN_DAYS=14                                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/shelf/lending.toml (Linux)                               │
//! │     ~/Library/Application Support/org.shelf.shelf/lending.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     7-day loans, 1.00 per overdue day                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # lending.toml
//! [database]
//! path = "shelf.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [loans]
//! default_length_days = 7
//! default_penalty_cents = 100
//!
//! [retry]
//! initial_backoff_ms = 10
//! max_backoff_ms = 500
//! max_attempts = 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use shelf_core::{Money, DEFAULT_LOAN_DAYS, DEFAULT_PENALTY_CENTS, MAX_LOAN_DAYS, MAX_PENALTY_CENTS};
use shelf_db::DbConfig;

use crate::retry::RetryPolicy;

// =============================================================================
// Config Error
// =============================================================================

/// Failures loading, validating or saving [`LendingConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// Where the store lives and how many connections it may use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path. `:memory:` selects a private in-memory store.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits on a locked database before giving up.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("shelf.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

// =============================================================================
// Loan Settings
// =============================================================================

/// Terms used when a checkout request leaves them out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanSettings {
    #[serde(default = "default_length_days")]
    pub default_length_days: u32,

    /// Penalty per overdue day, in cents.
    #[serde(default = "default_penalty_cents")]
    pub default_penalty_cents: i64,
}

fn default_length_days() -> u32 {
    DEFAULT_LOAN_DAYS
}

fn default_penalty_cents() -> i64 {
    DEFAULT_PENALTY_CENTS
}

impl Default for LoanSettings {
    fn default() -> Self {
        LoanSettings {
            default_length_days: default_length_days(),
            default_penalty_cents: default_penalty_cents(),
        }
    }
}

impl LoanSettings {
    pub fn default_penalty_rate(&self) -> Money {
        Money::from_cents(self.default_penalty_cents)
    }
}

// =============================================================================
// Retry Settings
// =============================================================================

/// Backoff for operations that lost a commit race.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_initial_backoff() -> u64 {
    10
}

fn default_max_backoff() -> u64 {
    500
}

fn default_max_attempts() -> u32 {
    5
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            max_attempts: default_max_attempts(),
        }
    }
}

// =============================================================================
// Main Lending Configuration
// =============================================================================

/// Complete lending configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LendingConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub loans: LoanSettings,

    #[serde(default)]
    pub retry: RetrySettings,
}

impl LendingConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (lending.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading lending config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides_from(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load lending config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Lending config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if !(1..=MAX_LOAN_DAYS).contains(&self.loans.default_length_days) {
            return Err(ConfigError::Invalid(format!(
                "loans.default_length_days must be between 1 and {}",
                MAX_LOAN_DAYS
            )));
        }

        if !(0..=MAX_PENALTY_CENTS).contains(&self.loans.default_penalty_cents) {
            return Err(ConfigError::Invalid(format!(
                "loans.default_penalty_cents must be between 0 and {}",
                MAX_PENALTY_CENTS
            )));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".into(),
            ));
        }

        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "retry.initial_backoff_ms must not exceed retry.max_backoff_ms".into(),
            ));
        }

        Ok(())
    }

    /// Applies `SHELF_*` overrides read through `lookup`.
    ///
    /// [`load`](Self::load) passes the process environment; tests pass a map.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("SHELF_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("SHELF_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid SHELF_MAX_CONNECTIONS"),
            }
        }

        if let Some(days) = lookup("SHELF_LOAN_DAYS") {
            match days.parse::<u32>() {
                Ok(n) => {
                    debug!(days = n, "Overriding default loan length from environment");
                    self.loans.default_length_days = n;
                }
                Err(_) => warn!(value = %days, "Ignoring invalid SHELF_LOAN_DAYS"),
            }
        }

        if let Some(cents) = lookup("SHELF_PENALTY_CENTS") {
            match cents.parse::<i64>() {
                Ok(n) => self.loans.default_penalty_cents = n,
                Err(_) => warn!(value = %cents, "Ignoring invalid SHELF_PENALTY_CENTS"),
            }
        }

        if let Some(attempts) = lookup("SHELF_RETRY_MAX_ATTEMPTS") {
            match attempts.parse::<u32>() {
                Ok(n) => self.retry.max_attempts = n,
                Err(_) => warn!(value = %attempts, "Ignoring invalid SHELF_RETRY_MAX_ATTEMPTS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "shelf", "shelf")
            .map(|dirs| dirs.config_dir().join("lending.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Store settings as a [`DbConfig`].
    pub fn db_config(&self) -> DbConfig {
        let base = if self.database.path.as_os_str() == ":memory:" {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
        };

        base.busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
            max_attempts: self.retry.max_attempts,
        }
    }
}
