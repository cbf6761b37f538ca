//! Dashboard configuration.

use std::env;

use chrono::{FixedOffset, Offset};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Settings for a dashboard instance.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// SQLite database file
    pub database_path: String,
    /// Rows per table page
    pub page_size: usize,
    /// Jump back to page 1 whenever a load, search or sort produces a new result set
    pub reset_page_on_new_results: bool,
    /// Offset used to turn search dates into whole local days
    pub utc_offset_minutes: i32,
    /// Default tracing filter, used when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            database_path: "clinic-diary.db".to_string(),
            page_size: 10,
            reset_page_on_new_results: false,
            utc_offset_minutes: chrono::Local::now().offset().fix().local_minus_utc() / 60,
            log_filter: "clinic_diary_core=info".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from `CLINIC_DIARY_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let database_path = env::var("CLINIC_DIARY_DB").unwrap_or(defaults.database_path);

        let page_size = match env::var("CLINIC_DIARY_PAGE_SIZE") {
            Ok(raw) => parse_page_size(&raw)?,
            Err(_) => defaults.page_size,
        };

        let reset_page_on_new_results = match env::var("CLINIC_DIARY_RESET_PAGE") {
            Ok(raw) => parse_flag("CLINIC_DIARY_RESET_PAGE", &raw)?,
            Err(_) => defaults.reset_page_on_new_results,
        };

        let utc_offset_minutes = match env::var("CLINIC_DIARY_UTC_OFFSET_MINUTES") {
            Ok(raw) => parse_offset_minutes(&raw)?,
            Err(_) => defaults.utc_offset_minutes,
        };

        let log_filter = env::var("CLINIC_DIARY_LOG").unwrap_or(defaults.log_filter);

        Ok(Self {
            database_path,
            page_size,
            reset_page_on_new_results,
            utc_offset_minutes,
            log_filter,
        })
    }

    /// Offset for local-day search bounds.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| chrono::Utc.fix())
    }
}

fn parse_page_size(raw: &str) -> Result<usize, ConfigError> {
    let size: usize = raw.trim().parse().map_err(|e| ConfigError::Invalid {
        name: "CLINIC_DIARY_PAGE_SIZE",
        reason: format!("{}", e),
    })?;
    if size == 0 {
        return Err(ConfigError::Invalid {
            name: "CLINIC_DIARY_PAGE_SIZE",
            reason: "must be at least 1".into(),
        });
    }
    Ok(size)
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got {:?}", other),
        }),
    }
}

fn parse_offset_minutes(raw: &str) -> Result<i32, ConfigError> {
    let minutes: i32 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
        name: "CLINIC_DIARY_UTC_OFFSET_MINUTES",
        reason: format!("{}", e),
    })?;
    if minutes.abs() >= 24 * 60 {
        return Err(ConfigError::Invalid {
            name: "CLINIC_DIARY_UTC_OFFSET_MINUTES",
            reason: "must be less than a day".into(),
        });
    }
    Ok(minutes)
}
