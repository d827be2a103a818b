//! Configuration management for termin
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::api::config::ServerConfig;
use crate::scheduler::calendar::CalendarSettings;
use crate::scheduler::lifecycle::RepeatTransitionPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Slot step and buffer
    pub calendar: CalendarSettings,

    /// Reservation lifecycle configuration
    pub reservations: ReservationSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/termin.db"),
        }
    }
}

/// Reservation lifecycle configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservationSettings {
    /// Hours a reservation may stay pending before it expires
    pub pending_ttl_hours: u64,

    /// Seconds between background expiry sweeps
    pub sweep_interval_secs: u64,

    /// Behaviour when a terminal transition is requested again
    pub repeat_transition: RepeatTransitionPolicy,
}

impl Default for ReservationSettings {
    fn default() -> Self {
        Self {
            pending_ttl_hours: 48,
            sweep_interval_secs: 300,
            repeat_transition: RepeatTransitionPolicy::Ignore,
        }
    }
}

impl ReservationSettings {
    /// Pending time-to-live
    #[must_use]
    pub fn pending_ttl(&self) -> chrono::Duration {
        i64::try_from(self.pending_ttl_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Sweep interval as Duration
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let bind_address = match std::env::var("TERMIN_BIND_ADDRESS") {
            Ok(addr) => addr
                .parse()
                .with_context(|| format!("Invalid TERMIN_BIND_ADDRESS: {addr}"))?,
            Err(_) => defaults.server.bind_address,
        };

        let repeat_transition = match std::env::var("TERMIN_REPEAT_TRANSITION").as_deref() {
            Ok("reject") => RepeatTransitionPolicy::Reject,
            Ok("ignore") | Err(_) => RepeatTransitionPolicy::Ignore,
            Ok(other) => anyhow::bail!("Invalid TERMIN_REPEAT_TRANSITION: {other}"),
        };

        Ok(Self {
            server: ServerConfig {
                bind_address,
                enable_cors: env_or("TERMIN_ENABLE_CORS", defaults.server.enable_cors),
                enable_request_logging: env_or(
                    "TERMIN_REQUEST_LOGGING",
                    defaults.server.enable_request_logging,
                ),
                enable_metrics: env_or("TERMIN_ENABLE_METRICS", defaults.server.enable_metrics),
                poll_interval_secs: env_or(
                    "TERMIN_POLL_INTERVAL",
                    defaults.server.poll_interval_secs,
                ),
            },
            database: DatabaseConfig {
                sqlite_path: std::env::var("TERMIN_SQLITE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.database.sqlite_path),
            },
            calendar: CalendarSettings {
                step_minutes: env_or("TERMIN_STEP_MINUTES", defaults.calendar.step_minutes),
                buffer_minutes: env_or("TERMIN_BUFFER_MINUTES", defaults.calendar.buffer_minutes),
            },
            reservations: ReservationSettings {
                pending_ttl_hours: env_or(
                    "TERMIN_PENDING_TTL_HOURS",
                    defaults.reservations.pending_ttl_hours,
                ),
                sweep_interval_secs: env_or(
                    "TERMIN_SWEEP_INTERVAL",
                    defaults.reservations.sweep_interval_secs,
                ),
                repeat_transition,
            },
            logging: LoggingConfig {
                level: std::env::var("TERMIN_LOG_LEVEL").unwrap_or(defaults.logging.level),
                format: std::env::var("TERMIN_LOG_FORMAT").unwrap_or(defaults.logging.format),
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.calendar.validate()?;

        if self.reservations.pending_ttl_hours == 0 {
            anyhow::bail!("pending_ttl_hours must be greater than 0");
        }

        if self.reservations.sweep_interval_secs == 0 {
            anyhow::bail!("sweep_interval_secs must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be 'text' or 'json', got '{}'", self.logging.format);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.calendar.step_minutes, 15);
        assert_eq!(config.calendar.buffer_minutes, 15);
        assert_eq!(
            config.reservations.repeat_transition,
            RepeatTransitionPolicy::Ignore
        );
    }

    #[test]
    fn test_invalid_step() {
        let mut config = Config::default();
        config.calendar.step_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = String::from("xml");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
                [calendar]
                buffer_minutes = 10

                [reservations]
                repeat_transition = "reject"
            "#,
        )
        .unwrap();

        assert_eq!(config.calendar.step_minutes, 15);
        assert_eq!(config.calendar.buffer_minutes, 10);
        assert_eq!(
            config.reservations.repeat_transition,
            RepeatTransitionPolicy::Reject
        );
        assert_eq!(config.reservations.pending_ttl_hours, 48);
    }

    #[test]
    fn test_durations() {
        let settings = ReservationSettings::default();
        assert_eq!(settings.pending_ttl(), chrono::Duration::hours(48));
        assert_eq!(settings.sweep_interval(), Duration::from_secs(300));
    }
}
