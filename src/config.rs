//! Configuration loader for the `agrilink-sensorflow` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
//!
use std::env;

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable; blank counts as unset.
macro_rules! optional_env {
    ($var_name:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string. Without one the service keeps its data
    /// in memory.
    pub db_url: Option<String>,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Upstream sensor feed polled by `POST /ingest`.
    pub api_url: Option<String>,

    /// Maximum number of feed pages to fetch (safety limit).
    pub api_max_pages: u32,

    /// Owner used when a request carries no identity. Unset means such
    /// requests are rejected.
    pub demo_owner_id: Option<String>,

    /// Socket address the HTTP server binds to.
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        // ---
        Self {
            db_url: None,
            db_pool_max: 5,
            api_url: None,
            api_max_pages: 100,
            demo_owner_id: None,
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `DATABASE_URL` – PostgreSQL connection string (default: in-memory store)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `SENSOR_API_URL` – upstream sensor feed base URL
/// - `API_MAX_PAGES` – max feed pages to fetch (default: 100)
/// - `DEMO_OWNER_ID` – owner for requests without `X-Owner-Id`
/// - `BIND_ADDR` – listen address (default: `0.0.0.0:8080`)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let defaults = Config::default();

    let db_url = optional_env!("DATABASE_URL");
    let api_url = optional_env!("SENSOR_API_URL");
    let demo_owner_id = optional_env!("DEMO_OWNER_ID");
    let bind_addr = optional_env!("BIND_ADDR").unwrap_or(defaults.bind_addr);
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", defaults.db_pool_max);
    let api_max_pages = parse_env_u32!("API_MAX_PAGES", defaults.api_max_pages);

    if db_pool_max == 0 {
        return Err(anyhow!("Invalid DB_POOL_MAX: must be at least 1"));
    }

    Ok(Config {
        db_url,
        db_pool_max,
        api_url,
        api_max_pages,
        demo_owner_id,
        bind_addr,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords while showing
    /// all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        let unset = || "(unset)".to_string();

        tracing::info!("Configuration loaded:");
        tracing::info!(
            "  DATABASE_URL   : {}",
            self.db_url.as_deref().map_or_else(unset, mask_db_url)
        );
        tracing::info!("  DB_POOL_MAX    : {}", self.db_pool_max);
        tracing::info!(
            "  SENSOR_API_URL : {}",
            self.api_url.clone().unwrap_or_else(unset)
        );
        tracing::info!("  API_MAX_PAGES  : {}", self.api_max_pages);
        tracing::info!(
            "  DEMO_OWNER_ID  : {}",
            self.demo_owner_id.clone().unwrap_or_else(unset)
        );
        tracing::info!("  BIND_ADDR      : {}", self.bind_addr);
    }
}

/// Replace the password of a connection URL with `****`.
pub fn mask_db_url(db_url: &str) -> String {
    // ---
    if let Some(at_pos) = db_url.rfind('@') {
        if let Some(colon_pos) = db_url[..at_pos].rfind(':') {
            // `scheme://host` has its only colon before the slashes
            if !db_url[colon_pos..at_pos].starts_with("://") {
                return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
            }
        }
    }
    db_url.to_string()
}
