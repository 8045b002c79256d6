//! Runtime settings loaded from the environment.
//!
//! `dotenvy::dotenv()` is called once in `main`, so a local `.env` file
//! behaves exactly like real environment variables here.

use std::net::SocketAddr;

use crate::error::AppError;

/// Which backend supplies tariff tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TariffSourceKind {
    /// One environment variable per tariff field.
    Env,
    /// Shared services catalog fetched over HTTP.
    Catalog,
}

/// Process-level configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub tariff_source: TariffSourceKind,
    /// Base URL of the services catalog (required for the catalog source).
    pub catalog_url: Option<String>,
    /// Catalog fetch timeout in seconds.
    pub catalog_timeout_secs: u64,
    /// TTL for cached tariff tables; 0 disables caching.
    pub tariff_cache_ttl_secs: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        let bind_addr = env_or("BIND_ADDR", "0.0.0.0:8020")
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Configuration(format!("Invalid BIND_ADDR: {}", e)))?;

        let tariff_source = match env_or("TARIFF_SOURCE", "env").trim().to_lowercase().as_str() {
            "env" => TariffSourceKind::Env,
            "catalog" => TariffSourceKind::Catalog,
            other => {
                return Err(AppError::Configuration(format!(
                    "TARIFF_SOURCE must be 'env' or 'catalog', got '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            bind_addr,
            tariff_source,
            catalog_url: std::env::var("KONG_GATEWAY_URL").ok().filter(|v| !v.trim().is_empty()),
            catalog_timeout_secs: env_u64("CATALOG_TIMEOUT_SECS", 5),
            tariff_cache_ttl_secs: env_u64("TARIFF_CACHE_TTL_SECS", 300),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(default)
}
