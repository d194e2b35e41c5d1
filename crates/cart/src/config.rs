//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `ROCKETSHOES_API_URL` - Base URL of the catalog/stock API (default: `http://localhost:3333`)
//! - `ROCKETSHOES_API_TOKEN` - Bearer token sent to the API
//! - `ROCKETSHOES_STORAGE_PATH` - File backing the local key-value store
//!   (default: `.rocketshoes/storage.json`)
//! - `ROCKETSHOES_CATALOG_CACHE_TTL_SECS` - Product metadata cache TTL (default: 300)
//! - `ROCKETSHOES_CORRUPT_CART` - What to do with an unreadable persisted cart:
//!   `discard` (default) or `fail`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:3333";
const DEFAULT_STORAGE_PATH: &str = ".rocketshoes/storage.json";
const DEFAULT_CATALOG_CACHE_TTL_SECS: &str = "300";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// How to treat a persisted cart entry that exists but cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptCartPolicy {
    /// Log a warning and start with an empty cart.
    #[default]
    Discard,
    /// Refuse to initialize the cart store.
    Fail,
}

impl FromStr for CorruptCartPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discard" => Ok(Self::Discard),
            "fail" => Ok(Self::Fail),
            other => Err(format!("expected `discard` or `fail`, got `{other}`")),
        }
    }
}

/// Cart application configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Catalog and stock API settings
    pub api: ApiConfig,
    /// File backing the local key-value store
    pub storage_path: PathBuf,
    /// Handling of an unreadable persisted cart
    pub corrupt_cart: CorruptCartPolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Catalog and stock API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL; `products/{id}` and `stock/{id}` are resolved against it
    pub base_url: Url,
    /// Optional bearer token
    pub token: Option<SecretString>,
    /// How long product metadata stays cached
    pub catalog_cache_ttl: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("catalog_cache_ttl", &self.catalog_cache_ttl)
            .finish()
    }
}

impl ApiConfig {
    /// API configuration for `base_url` with no token and the default cache TTL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not a valid absolute URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("ROCKETSHOES_API_URL", base_url)?,
            token: None,
            catalog_cache_ttl: Duration::from_secs(300),
        })
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`CartConfig::from_env`].
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let base_url = parse_base_url(
            "ROCKETSHOES_API_URL",
            &or_default("ROCKETSHOES_API_URL", DEFAULT_API_URL),
        )?;

        let token = match lookup("ROCKETSHOES_API_TOKEN") {
            Some(value) if value.is_empty() => None,
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::InvalidEnvVar(
                    "ROCKETSHOES_API_TOKEN".to_string(),
                    "must not be blank".to_string(),
                ));
            }
            Some(value) => Some(SecretString::from(value)),
            None => None,
        };

        let ttl_secs = or_default(
            "ROCKETSHOES_CATALOG_CACHE_TTL_SECS",
            DEFAULT_CATALOG_CACHE_TTL_SECS,
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar(
                "ROCKETSHOES_CATALOG_CACHE_TTL_SECS".to_string(),
                e.to_string(),
            )
        })?;

        let corrupt_cart = or_default("ROCKETSHOES_CORRUPT_CART", "discard")
            .parse::<CorruptCartPolicy>()
            .map_err(|e| ConfigError::InvalidEnvVar("ROCKETSHOES_CORRUPT_CART".to_string(), e))?;

        Ok(Self {
            api: ApiConfig {
                base_url,
                token,
                catalog_cache_ttl: Duration::from_secs(ttl_secs),
            },
            storage_path: PathBuf::from(or_default("ROCKETSHOES_STORAGE_PATH", DEFAULT_STORAGE_PATH)),
            corrupt_cart,
            sentry_dsn: lookup("SENTRY_DSN").filter(|v| !v.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT").filter(|v| !v.is_empty()),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an API base URL, making sure relative joins keep its path.
fn parse_base_url(var_name: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    // `Url::join` drops the last path segment unless the path ends in '/'
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
