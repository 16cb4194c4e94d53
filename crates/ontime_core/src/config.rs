//! Runtime configuration for core callers.
//!
//! | Env Var            | Default                         |
//! |--------------------|---------------------------------|
//! | `ONTIME_DB_PATH`   | unset (in-memory database)      |
//! | `ONTIME_PAGE_SIZE` | `2`                             |
//! | `ONTIME_LOG_LEVEL` | `debug` / `info` by build mode  |
//! | `ONTIME_LOG_DIR`   | unset (file logging disabled)   |

use crate::logging::default_log_level;
use crate::pagination::DEFAULT_PAGE_SIZE;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "ONTIME_DB_PATH";
pub const ENV_PAGE_SIZE: &str = "ONTIME_PAGE_SIZE";
pub const ENV_LOG_LEVEL: &str = "ONTIME_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "ONTIME_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidPageSize(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPageSize(value) => write!(
                f,
                "{ENV_PAGE_SIZE} must be a positive integer, got `{value}`"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Settings shared by the CLI and any embedding presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// Database file; `None` opens an in-memory database.
    pub db_path: Option<PathBuf>,
    /// Items per listing page. Always greater than zero.
    pub page_size: u32,
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` disables file logs.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            page_size: DEFAULT_PAGE_SIZE,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, treating blank values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let page_size = match read(ENV_PAGE_SIZE) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(value) if value > 0 => value,
                _ => return Err(ConfigError::InvalidPageSize(raw)),
            },
            None => defaults.page_size,
        };

        Ok(Self {
            db_path: read(ENV_DB_PATH).map(PathBuf::from),
            page_size,
            log_level: read(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
        })
    }
}
