//! Runtime configuration for the quorum binary.
//!
//! Values resolve in order: builder override, environment variable, default.
//! [`Config::load`] reads a `.env` file into the environment first.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use crate::utils::get_database_path;
use crate::validation::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub const DATABASE_PATH_VAR: &str = "QUORUM_DATABASE_PATH";
pub const BUSY_TIMEOUT_VAR: &str = "QUORUM_BUSY_TIMEOUT_MS";
pub const PAGE_SIZE_VAR: &str = "QUORUM_PAGE_SIZE";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    pub busy_timeout: Duration,
    /// Page size used when a listing command is not given one.
    pub page_size: i64,
}

impl Config {
    /// Loads `.env` if present, then resolves from the environment.
    pub fn load() -> Result<Self> {
        ConfigBuilder::new().load()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for constructing a [`Config`].
///
/// # Examples
///
/// ```
/// use quorum::config::Config;
///
/// let config = Config::builder()
///     .database_path("/tmp/forum.db")
///     .page_size(20)
///     .build()
///     .expect("valid config");
/// assert_eq!(config.page_size, 20);
/// ```
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    database_path: Option<PathBuf>,
    busy_timeout: Option<Duration>,
    page_size: Option<i64>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    pub fn page_size(mut self, page_size: i64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Loads `.env` if present, then builds.
    ///
    /// Variables already set in the process environment win over the file.
    pub fn load(self) -> Result<Config> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e).context("Failed to read .env file"),
        }
        self.build()
    }

    /// Fills unset values from the environment, then defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse, the page size
    /// is outside `1..=100`, or no default data directory exists.
    pub fn build(self) -> Result<Config> {
        let database_path = match self.database_path {
            Some(path) => path,
            None => match env_var(DATABASE_PATH_VAR) {
                Some(path) => PathBuf::from(path),
                None => get_database_path()?,
            },
        };

        let busy_timeout = match self.busy_timeout {
            Some(timeout) => timeout,
            None => Duration::from_millis(
                parse_var(BUSY_TIMEOUT_VAR)?.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS),
            ),
        };

        let page_size = match self.page_size {
            Some(size) => size,
            None => parse_var(PAGE_SIZE_VAR)?.unwrap_or(DEFAULT_PAGE_SIZE),
        };
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            anyhow::bail!("Page size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}");
        }

        Ok(Config {
            database_path,
            busy_timeout,
            page_size,
        })
    }
}

/// Reads a variable, treating blank values as unset.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_var(key)
        .map(|value| {
            value
                .parse()
                .with_context(|| format!("Invalid {key} value: {value}"))
        })
        .transpose()
}
