//! Configuration types

use crate::ConfigError;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Longest polling interval or overdue window accepted, in seconds (one year).
pub const MAX_POLLING_SECS: u64 = 365 * 24 * 60 * 60;

/// Filter translation and execution settings.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Text comparisons ignore case.
    pub case_insensitive: bool,
    /// Expected interval between two controller polls.
    pub polling_interval_secs: u64,
    /// Grace period after a missed poll before a target counts as overdue.
    pub polling_overdue_secs: u64,
    /// Page requests with a larger limit are rejected.
    pub max_page_size: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            polling_interval_secs: 300,
            polling_overdue_secs: 300,
            max_page_size: 500,
        }
    }
}

impl FilterConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: FilterConfig = toml::from_str(source).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `RSQL_*` environment variable overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup, then validate.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("RSQL_CASE_INSENSITIVE") {
            self.case_insensitive = parse_override("RSQL_CASE_INSENSITIVE", &raw)?;
        }
        if let Some(raw) = lookup("RSQL_POLLING_INTERVAL_SECS") {
            self.polling_interval_secs = parse_override("RSQL_POLLING_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("RSQL_POLLING_OVERDUE_SECS") {
            self.polling_overdue_secs = parse_override("RSQL_POLLING_OVERDUE_SECS", &raw)?;
        }
        if let Some(raw) = lookup("RSQL_MAX_PAGE_SIZE") {
            self.max_page_size = parse_override("RSQL_MAX_PAGE_SIZE", &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - polling_interval_secs in 1..=MAX_POLLING_SECS
    /// - polling_overdue_secs <= MAX_POLLING_SECS
    /// - max_page_size > 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling_interval_secs == 0 || self.polling_interval_secs > MAX_POLLING_SECS {
            return Err(ConfigError::InvalidValue {
                field: "polling_interval_secs".to_string(),
                value: self.polling_interval_secs.to_string(),
                reason: format!("must be between 1 and {}", MAX_POLLING_SECS),
            });
        }

        if self.polling_overdue_secs > MAX_POLLING_SECS {
            return Err(ConfigError::InvalidValue {
                field: "polling_overdue_secs".to_string(),
                value: self.polling_overdue_secs.to_string(),
                reason: format!("must not exceed {}", MAX_POLLING_SECS),
            });
        }

        if self.max_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_page_size".to_string(),
                value: self.max_page_size.to_string(),
                reason: "max_page_size must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Time after which a silent target is overdue: poll interval plus grace.
    pub fn overdue_window(&self) -> TimeDelta {
        let secs = self
            .polling_interval_secs
            .saturating_add(self.polling_overdue_secs)
            .min(2 * MAX_POLLING_SECS);
        TimeDelta::seconds(secs as i64)
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: key.to_string(),
        value: raw.to_string(),
        reason: "cannot be parsed".to_string(),
    })
}
