//! Viewer preferences
//!
//! Preferences are read once at startup from a JSON document (the contents of
//! the browser's preference store) and may be overridden from the environment.

use crate::{logging::LogLevel, Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable overriding the log level
pub const LOG_LEVEL_ENV: &str = "SQLITE_VIEWER_LOG";
/// Environment variable overriding the rows shown per page
pub const ROWS_PER_PAGE_ENV: &str = "SQLITE_VIEWER_ROWS_PER_PAGE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Page size used for browsing and "current view" exports
    pub rows_per_page: u64,
    /// Seed the demo dataset when a session starts without a user file
    pub seed_demo: bool,
    /// Render BLOB columns through `hex()` when browsing
    pub hex_blobs: bool,
    /// Quiet period before a filter edit triggers a fetch
    pub debounce_ms: u64,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rows_per_page: 50,
            seed_demo: true,
            hex_blobs: true,
            debounce_ms: 100,
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Parse preferences from JSON; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SQLITE_VIEWER_LOG` and `SQLITE_VIEWER_ROWS_PER_PAGE` when set
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            self.log_level = LogLevel::from_str(&level).map_err(Error::Config)?;
        }
        if let Some(rows) = lookup(ROWS_PER_PAGE_ENV) {
            self.rows_per_page = rows.trim().parse().map_err(|_| {
                Error::Config(format!("{ROWS_PER_PAGE_ENV} must be a positive integer, got '{rows}'"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows_per_page == 0 {
            return Err(Error::Config("rowsPerPage must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
