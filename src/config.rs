//! Configuration management for the store connection and aggregation policy.
//!
//! Settings come from a TOML file (default `voucherbook.toml`, overridable
//! via `VOUCHERBOOK_CONFIG`), with the store connection additionally
//! overridable through `MONGODB_URI` / `MONGODB_DATABASE` environment
//! variables. Every setting has a default, so running with no config file at
//! all is supported.

use crate::core::aggregate::{AggregationOptions, DEFAULT_CONCURRENCY_LIMIT};
use crate::core::rows::UnmatchedRowPolicy;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming the config file to load.
pub const CONFIG_PATH_ENV: &str = "VOUCHERBOOK_CONFIG";
/// Config file loaded when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "voucherbook.toml";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Document store connection settings
    pub store: StoreConfig,
    /// Cross-year aggregation settings
    pub aggregation: AggregationSettings,
    /// What update does with row patches naming no stored row
    pub unmatched_row_policy: UnmatchedRowPolicy,
}

/// Document store connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// MongoDB connection URI
    pub uri: String,
    /// Database holding the yearly voucher collections
    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "voucherbook".to_string(),
        }
    }
}

/// Cross-year aggregation settings, the serializable face of
/// [`AggregationOptions`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregationSettings {
    /// Maximum year-queries in flight at once
    pub concurrency_limit: usize,
    /// Optional per-year query deadline in milliseconds
    pub per_year_timeout_ms: Option<u64>,
    /// Fail instead of returning a partial result when a year fails
    pub strict: bool,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            per_year_timeout_ms: None,
            strict: false,
        }
    }
}

impl AggregationSettings {
    /// Converts these settings into the aggregator's option struct.
    #[must_use]
    pub fn to_options(&self) -> AggregationOptions {
        AggregationOptions {
            concurrency_limit: self.concurrency_limit,
            per_year_timeout: self.per_year_timeout_ms.map(Duration::from_millis),
            strict: self.strict,
        }
    }
}

/// Loads configuration from a TOML file.
///
/// # Errors
/// [`Error::Config`] when the file cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    debug!(path = %path.display(), "loading configuration");
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("failed to read config file {}: {e}", path.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("failed to parse config file {}: {e}", path.display()),
    })
}

/// Loads the application configuration: the file named by
/// `VOUCHERBOOK_CONFIG` (default `voucherbook.toml`), falling back to
/// built-in defaults when no file exists, then environment overrides for the
/// store connection.
///
/// # Errors
/// [`Error::Config`] when a config file exists but cannot be read or parsed.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        info!(path, "no config file found, using defaults");
        AppConfig::default()
    };

    if let Ok(uri) = std::env::var("MONGODB_URI") {
        config.store.uri = uri;
    }
    if let Ok(database) = std::env::var("MONGODB_DATABASE") {
        config.store.database = database;
    }
    Ok(config)
}
