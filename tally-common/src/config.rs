//! Bootstrap configuration loading and root folder resolution
//!
//! Settings resolve in priority order: command line, environment, TOML file,
//! compiled default.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the data root folder
pub const ROOT_FOLDER_ENV: &str = "TALLY_ROOT_FOLDER";

/// Bootstrap configuration file contents
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Data folder holding the SQLite database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP admin port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub election: ElectionConfig,

    #[serde(default)]
    pub collector: CollectorConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            logging: LoggingConfig::default(),
            search: SearchConfig::default(),
            election: ElectionConfig::default(),
            collector: CollectorConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Search-answer API used for text extraction
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_search_endpoint(),
            requests_per_minute: default_requests_per_minute(),
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Election-day instants the phase model is anchored to
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ElectionConfig {
    #[serde(default)]
    pub voting_start: Option<DateTime<Utc>>,

    #[serde(default)]
    pub voting_end: Option<DateTime<Utc>>,
}

/// Collection loop tuning
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Upper bound on a single source fetch
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Start the collection loop at launch
    #[serde(default)]
    pub autostart: bool,

    #[serde(default = "default_true")]
    pub news_enabled: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout_secs(),
            autostart: false,
            news_enabled: true,
        }
    }
}

fn default_port() -> u16 {
    5780
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_search_endpoint() -> String {
    "https://api.tavily.com/search".to_string()
}

fn default_requests_per_minute() -> u32 {
    30
}

fn default_request_timeout_secs() -> u64 {
    45
}

fn default_fetch_timeout_secs() -> u64 {
    90
}

fn default_true() -> bool {
    true
}

/// Parse a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    parse_toml_config(&content)
}

pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Load the TOML file at `explicit` or the platform default location
///
/// A missing default file yields built-in defaults; a missing explicit file is
/// an error.
pub fn load_or_default(explicit: Option<&Path>) -> Result<TomlConfig> {
    match explicit {
        Some(path) => load_toml_config(path),
        None => match default_config_path() {
            Some(path) if path.exists() => load_toml_config(&path),
            _ => Ok(TomlConfig::default()),
        },
    }
}

/// Root folder resolution:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// `~/.config/tally/config.toml` (or the platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tally").join("config.toml"))
}

/// OS-dependent default data folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tally"))
        .unwrap_or_else(|| PathBuf::from("./tally_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = parse_toml_config("").unwrap();
        assert_eq!(config.port, 5780);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.search.requests_per_minute, 30);
        assert!(config.collector.news_enabled);
        assert!(!config.collector.autostart);
        assert!(config.election.voting_start.is_none());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = parse_toml_config("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_cli_argument_wins() {
        let config = TomlConfig {
            root_folder: Some(PathBuf::from("/from/toml")),
            ..Default::default()
        };
        let path = resolve_root_folder(Some("/from/cli"), "TALLY_TEST_UNSET_VAR", &config);
        assert_eq!(path, PathBuf::from("/from/cli"));
    }
}
