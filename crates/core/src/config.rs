//! # Herodex Configuration
//!
//! Centralized configuration for the catalog engine and its remote source.
//!
//! ## Environment
//!
//! - `MARVEL_API_URL` - base URL of the character API
//! - `MARVEL_PUBLIC_KEY` / `MARVEL_PRIVATE_KEY` - request signing keys
//! - `HERODEX_PAGE_SIZE` - page size for browse and search paging
//! - `HERODEX_DEBOUNCE_MS` - quiet period before a search term settles
//!
//! ## Example
//! ```rust,ignore
//! use herodex_core::config::CatalogConfig;
//!
//! let config = CatalogConfig::from_env()?;
//! let page = config.page_size;
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default page size used by the remote source
pub const DEFAULT_PAGE_SIZE: u32 = 15;

/// Minimum settled query length (in chars) that switches to search mode
pub const DEFAULT_MIN_QUERY_LEN: usize = 3;

/// Remote API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://gateway.marvel.com/v1/public`
    pub base_url: String,
    /// Public key sent as `apikey`
    pub public_key: String,
    /// Private key, only ever used to compute the request hash
    #[serde(skip_serializing, default)]
    pub private_key: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gateway.marvel.com/v1/public".to_string(),
            public_key: String::new(),
            private_key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether both signing keys are present
    pub fn has_credentials(&self) -> bool {
        !self.public_key.is_empty() && !self.private_key.is_empty()
    }
}

/// Configuration for the catalog engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Remote source settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Records per page (browse and search)
    pub page_size: u32,
    /// Comics fetched per character detail request
    pub comics_limit: u32,
    /// Trailing debounce delay for search input
    pub debounce_ms: u64,
    /// Settled query length that enters search mode
    pub min_query_len: usize,
    /// Favorite store key holding the serialized favorite set
    pub favorites_key: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
            comics_limit: DEFAULT_PAGE_SIZE,
            debounce_ms: 500,
            min_query_len: DEFAULT_MIN_QUERY_LEN,
            favorites_key: "favorites".to_string(),
        }
    }
}

impl CatalogConfig {
    /// Defaults overlaid with whatever the environment provides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("MARVEL_API_URL") {
            config.api.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(key) = std::env::var("MARVEL_PUBLIC_KEY") {
            config.api.public_key = key;
        }
        if let Ok(key) = std::env::var("MARVEL_PRIVATE_KEY") {
            config.api.private_key = key;
        }
        if let Ok(size) = std::env::var("HERODEX_PAGE_SIZE") {
            config.page_size = size
                .parse()
                .with_context(|| format!("Invalid HERODEX_PAGE_SIZE: {}", size))?;
        }
        if let Ok(ms) = std::env::var("HERODEX_DEBOUNCE_MS") {
            config.debounce_ms = ms
                .parse()
                .with_context(|| format!("Invalid HERODEX_DEBOUNCE_MS: {}", ms))?;
        }

        if config.page_size == 0 {
            anyhow::bail!("page size must be greater than zero");
        }

        Ok(config)
    }

    /// Debounce delay as a `Duration`
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.page_size, 15);
        assert_eq!(config.min_query_len, 3);
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.favorites_key, "favorites");
        assert!(!config.api.has_credentials());
    }

    #[test]
    fn test_private_key_not_serialized() {
        let mut config = CatalogConfig::default();
        config.api.private_key = "secret".to_string();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
