//! Configuration management for the KPI dashboard host
//!
//! The engine itself is configured per request; this crate covers the
//! host-level settings the dashboard reads once at startup: where the
//! operational database lives, how many pooled connections the query
//! collaborator may hold, and the reporting defaults (canonical week
//! start, monthly floor date) that individual pages inherit.

use chrono::{NaiveDate, Weekday};
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KpiConfig {
    /// Operational database connection settings
    pub database: DatabaseConfig,

    /// Reporting defaults shared by all pages
    pub reporting: ReportingConfig,

    /// Observability settings
    pub observability: ObservabilityConfig,
}

impl KpiConfig {
    /// Load configuration from file and environment
    ///
    /// Environment variables prefixed with `KPI_` override file values
    /// (`KPI_DATABASE__MAX_CONNECTIONS=2`).
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(path) = config_path {
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment.merge(Env::prefixed("KPI_").split("__"));

        figment
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "Database name required".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "max_connections must be greater than 0".to_string(),
            ));
        }

        self.reporting.validate()
    }
}

/// Database connection settings for the query collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database name (referenced by cross-database queries)
    pub name: String,

    /// Connection URL
    pub url: String,

    /// Maximum number of pooled connections
    pub max_connections: u32,

    /// Connection timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: "commerce".to_string(),
            url: "postgres://localhost:5432/commerce".to_string(),
            max_connections: 4,
            timeout_secs: 30,
        }
    }
}

/// Reporting defaults inherited by dashboard pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    /// Canonical week start weekday (pages may override per call site)
    #[serde(with = "weekday_serde")]
    pub week_start: Weekday,

    /// Earliest date admitted into monthly roll-ups; data before this
    /// predates reliable bookkeeping and is excluded
    pub monthly_floor_date: Option<NaiveDate>,

    /// Default number of days shown when no range is selected
    pub default_range_days: u32,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            week_start: Weekday::Mon,
            monthly_floor_date: NaiveDate::from_ymd_opt(2023, 10, 1),
            default_range_days: 7,
        }
    }
}

impl ReportingConfig {
    fn validate(&self) -> Result<()> {
        if self.default_range_days == 0 {
            return Err(ConfigError::ValidationError(
                "default_range_days must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,

    /// Enable structured JSON logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}

mod weekday_serde {
    use chrono::Weekday;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(day: &Weekday, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&day.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Weekday, D::Error> {
        let s = String::deserialize(de)?;
        Weekday::from_str(&s).map_err(|_| D::Error::custom(format!("invalid weekday: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KpiConfig::default();
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.reporting.week_start, Weekday::Mon);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = KpiConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = KpiConfig::default();
        config.database.name.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_weekday_round_trip() {
        let config = KpiConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: KpiConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.reporting.week_start, Weekday::Mon);
    }

    #[test]
    fn test_monthly_floor_default() {
        let config = ReportingConfig::default();
        assert_eq!(
            config.monthly_floor_date,
            NaiveDate::from_ymd_opt(2023, 10, 1)
        );
    }
}
