//! Logging functionality for `sqlite_wasm_viewer`
//!
//! Library code logs through the `log` facade under the crate's target. The
//! `init_*` helpers install an `env_logger` backend for binaries and tests.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Once;

const TARGET: &str = "sqlite_wasm_viewer";

static INIT: Once = Once::new();

/// Log levels in order of increasing verbosity
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only critical errors that prevent operation
    Error = 0,
    /// Important warnings and errors
    #[serde(alias = "warning")]
    Warn = 1,
    /// General information about operations
    #[default]
    Info = 2,
    /// Detailed debugging information
    Debug = 3,
    /// Very detailed tracing information
    Trace = 4,
}

impl LogLevel {
    /// The matching `log` filter
    #[must_use]
    pub const fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(format!("Invalid log level: {s}")),
        }
    }
}

/// Install the `env_logger` backend (once) and set the global level
pub fn init_logger(level: LogLevel) {
    INIT.call_once(|| {
        // Another logger may already be installed by the host binary
        let _ = env_logger::Builder::new()
            .filter_level(log::LevelFilter::Trace)
            .format_target(true)
            .try_init();
    });
    set_log_level(level);
}

/// Initialize the global logger with default level (Info)
pub fn init_default_logger() {
    init_logger(LogLevel::default());
}

/// Set the global log level
pub fn set_log_level(level: LogLevel) {
    log::set_max_level(level.to_level_filter());
}

/// Check if a log level is enabled
#[must_use]
pub fn is_enabled(level: LogLevel) -> bool {
    level.to_level_filter() <= log::max_level()
}

/// Convenience functions for crate logging
pub fn log_error(message: &str) {
    log::error!(target: TARGET, "{message}");
}

pub fn log_warn(message: &str) {
    log::warn!(target: TARGET, "{message}");
}

pub fn log_info(message: &str) {
    log::info!(target: TARGET, "{message}");
}

pub fn log_debug(message: &str) {
    log::debug!(target: TARGET, "{message}");
}

pub fn log_trace(message: &str) {
    log::trace!(target: TARGET, "{message}");
}
