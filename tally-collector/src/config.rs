//! Configuration resolution for tally-collector
//!
//! The search API key resolves with Environment → TOML priority.

use tally_common::config::TomlConfig;
use tally_common::{Error, Result};
use tracing::{info, warn};

/// Environment variable holding the search API key
pub const SEARCH_API_KEY_ENV: &str = "TALLY_SEARCH_API_KEY";

/// Resolve the search API key from the environment, then the TOML config
pub fn resolve_search_api_key(toml_config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var(SEARCH_API_KEY_ENV)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .search
        .api_key
        .as_ref()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("Search API key found in environment and TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        info!("Search API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("Search API key loaded from TOML config");
        return Ok(key.clone());
    }

    Err(Error::Config(format!(
        "Search API key not configured. Set {} or add `api_key` under [search] in the TOML config",
        SEARCH_API_KEY_ENV
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("tvly-abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key(" \t"));
    }
}
