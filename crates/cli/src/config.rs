//! CRM configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CRM_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   the generic `DATABASE_URL`)
//!
//! ## Optional
//! - `CRM_LOG_DIR` - Directory for job log files (default: /tmp)
//! - `CRM_RESTOCK_THRESHOLD` - Stock level counting as low (default: 10)
//! - `CRM_RESTOCK_AMOUNT` - Units added per low-stock product (default: 10)
//! - `CRM_RETENTION_DAYS` - Customer cleanup window in days (default: 365)
//! - `CRM_REMINDER_WINDOW_DAYS` - Order reminder lookback in days (default: 7)
//! - `CRM_HEARTBEAT_INTERVAL_SECS` - Heartbeat period (default: 300)
//! - `CRM_RESTOCK_INTERVAL_SECS` - Replenishment period (default: 43200)
//! - `CRM_REMINDERS_INTERVAL_SECS` - Reminder period (default: 86400)
//! - `CRM_CLEANUP_INTERVAL_SECS` - Cleanup period (default: 604800)
//! - `CRM_REPORT_INTERVAL_SECS` - Report period (default: 604800)

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use meridian_jobs::JobIntervals;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// CRM application configuration.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Directory job log files are appended under
    pub log_dir: PathBuf,
    /// Stock level below which a product is replenished
    pub restock_threshold: i32,
    /// Units added to each low-stock product
    pub restock_amount: i32,
    /// Days without an order before a customer is stale
    pub retention_days: i64,
    /// Lookback window in days for order reminders
    pub reminder_window_days: i64,
    /// How often each scheduled job fires
    pub intervals: JobIntervals,
}

impl CrmConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the database URL is missing or a numeric
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let intervals = JobIntervals {
            heartbeat: get_duration_secs("CRM_HEARTBEAT_INTERVAL_SECS", 300)?,
            replenishment: get_duration_secs("CRM_RESTOCK_INTERVAL_SECS", 12 * 60 * 60)?,
            reminders: get_duration_secs("CRM_REMINDERS_INTERVAL_SECS", 24 * 60 * 60)?,
            cleanup: get_duration_secs("CRM_CLEANUP_INTERVAL_SECS", 7 * 24 * 60 * 60)?,
            report: get_duration_secs("CRM_REPORT_INTERVAL_SECS", 7 * 24 * 60 * 60)?,
        };

        Ok(Self {
            database_url: get_database_url("CRM_DATABASE_URL")?,
            log_dir: PathBuf::from(get_env_or_default("CRM_LOG_DIR", "/tmp")),
            restock_threshold: get_parsed("CRM_RESTOCK_THRESHOLD", 10)?,
            restock_amount: get_parsed("CRM_RESTOCK_AMOUNT", 10)?,
            retention_days: get_parsed("CRM_RETENTION_DAYS", 365)?,
            reminder_window_days: get_parsed("CRM_REMINDER_WINDOW_DAYS", 7)?,
            intervals,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional numeric environment variable, with a default.
fn get_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

fn get_duration_secs(key: &str, default_secs: u64) -> Result<Duration, ConfigError> {
    get_parsed(key, default_secs).map(Duration::from_secs)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_get_parsed_default() {
        assert_eq!(get_parsed("MERIDIAN_TEST_UNSET_VAR", 42_i32).unwrap(), 42);
    }

    #[test]
    fn test_get_env_or_default() {
        assert_eq!(
            get_env_or_default("MERIDIAN_TEST_UNSET_VAR", "/tmp"),
            "/tmp"
        );
    }
}
