//! Configuration management.
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! `CROSSREF_SEARCH_*` environment variables (`__` separates section and key,
//! e.g. `CROSSREF_SEARCH_CROSSREF__TIMEOUT_SECONDS=5`). Command-line flags are
//! applied on top by the binary.

mod file_config;

pub use file_config::ConfigFileError;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{SearchFilters, SortBy, DEFAULT_RESULTS_PER_PAGE};
use crate::sources::{CROSSREF_API_BASE, DEFAULT_MAILTO};
use crate::utils::{FileStore, DEFAULT_HISTORY_CAPACITY};

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "CROSSREF_SEARCH";

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "crossref-search.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// CrossRef API settings
    #[serde(default)]
    pub crossref: CrossRefConfig,

    /// Search defaults
    #[serde(default)]
    pub search: SearchConfig,

    /// Search history settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// CrossRef API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossRefConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Contact address for the polite pool
    #[serde(default = "default_mailto")]
    pub mailto: String,

    /// Per-search deadline
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for CrossRefConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            mailto: default_mailto(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl CrossRefConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_base_url() -> String {
    CROSSREF_API_BASE.to_string()
}

fn default_mailto() -> String {
    DEFAULT_MAILTO.to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

/// Defaults for new searches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_results_per_page")]
    pub results_per_page: u32,

    #[serde(default)]
    pub sort_by: SortBy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            results_per_page: default_results_per_page(),
            sort_by: SortBy::default(),
        }
    }
}

impl SearchConfig {
    /// Filters a new search starts from
    pub fn filters(&self) -> SearchFilters {
        SearchFilters::new(self.results_per_page).sort_by(self.sort_by)
    }
}

fn default_results_per_page() -> u32 {
    DEFAULT_RESULTS_PER_PAGE
}

/// Search history settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Storage directory; the platform config directory when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            max_entries: default_max_entries(),
        }
    }
}

impl HistoryConfig {
    /// File store for the configured directory
    pub fn store(&self) -> FileStore {
        match &self.directory {
            Some(dir) => FileStore::new(dir),
            None => FileStore::default_location(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_entries() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json` for structured output, plain text otherwise
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from an optional file plus the environment
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    build_config(path, None)
}

fn build_config(
    path: Option<&Path>,
    env: Option<HashMap<String, String>>,
) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        )
        .build()?;

    settings.try_deserialize()
}

/// Locate a configuration file: `./crossref-search.toml`, then
/// `<config dir>/crossref-search/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join(env!("CARGO_PKG_NAME")).join("config.toml"))
        .filter(|path| path.is_file())
}

/// Default path for `config init`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(env!("CARGO_PKG_NAME"))
        .join("config.toml")
}
