//! Tariff sources and the resolution context handed to pricing rules.
//!
//! Two interchangeable backends sit behind `TariffSource`: an offline
//! env-variable source and a remote services-catalog fetch. Both produce
//! `Tariffs` satisfying the same field contract, so every rule prices
//! identically regardless of where the numbers came from.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheStats, TariffCache};
use crate::error::AppError;
use crate::pricing::addons::AddonPriceTable;
use crate::pricing::tariffs::{
    coerce_gst, coerce_gst_str, coerce_int, coerce_int_str, ServiceTariffSpec, Tariffs,
};

/// A backend that can turn a service's field spec into a tariff table.
#[async_trait]
pub trait TariffSource: Send + Sync {
    async fn resolve(&self, spec: &ServiceTariffSpec) -> Result<Tariffs, AppError>;
}

/// Offline source: one environment variable per tariff field.
///
/// The variable set is snapshotted at construction so a resolved table is a
/// pure function of that snapshot.
pub struct EnvTariffSource {
    vars: HashMap<String, String>,
}

impl EnvTariffSource {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str()).filter(|s| !s.trim().is_empty())
    }
}

#[async_trait]
impl TariffSource for EnvTariffSource {
    async fn resolve(&self, spec: &ServiceTariffSpec) -> Result<Tariffs, AppError> {
        let mut values = HashMap::new();
        for field in spec.fields {
            let value = match self.get(field.env_key) {
                Some(raw) => coerce_int_str(raw, field.default),
                None => field.default,
            };
            values.insert(field.name, value);
        }
        let gst = coerce_gst_str(self.get("GST_PERCENTAGE"));
        let note = self.get(spec.note_env).unwrap_or("").to_string();
        Ok(Tariffs::new(values, gst, note))
    }
}

/// Remote source: fetches the shared services catalog and selects the row
/// whose `service_type` matches the service's catalog label.
pub struct CatalogTariffSource {
    client: reqwest::Client,
    base_url: String,
}

impl CatalogTariffSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    async fn fetch_rows(&self) -> Result<Vec<Value>, AppError> {
        let url = format!("{}/items/services", self.base_url);
        debug!("Fetching tariff catalog from {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                AppError::Configuration(format!("Failed to fetch pricing from {}: {}", url, e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::Configuration(format!(
                "Failed to fetch pricing from {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let raw = response.text().await.map_err(|e| {
            AppError::Configuration(format!("Failed to read pricing response: {}", e))
        })?;

        let payload = parse_with_recovery(&raw)?;
        match payload.get("data") {
            // Missing or null data reads as an empty catalog; the per-service
            // row lookup then reports the service as unpriced.
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(rows)) => Ok(rows.clone()),
            Some(_) => Err(AppError::Configuration(
                "Invalid pricing payload: expected a list under 'data'".to_string(),
            )),
        }
    }
}

#[async_trait]
impl TariffSource for CatalogTariffSource {
    async fn resolve(&self, spec: &ServiceTariffSpec) -> Result<Tariffs, AppError> {
        let rows = self.fetch_rows().await?;

        let wanted = spec.catalog_type.to_lowercase();
        let row = rows
            .iter()
            .find(|row| {
                row.get("service_type")
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_lowercase() == wanted)
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                AppError::Configuration(format!(
                    "Pricing for service '{}' not found",
                    spec.catalog_type
                ))
            })?;

        let mut values = HashMap::new();
        for field in spec.fields {
            // First present column wins; legacy column names come last.
            let raw = field.catalog_keys.iter().find_map(|key| row.get(*key));
            let value = match raw {
                Some(v) => coerce_int(v, field.default),
                None => field.default,
            };
            values.insert(field.name, value);
        }

        let gst = coerce_gst(row.get("gst_percentage"));
        let note = row.get("note").and_then(Value::as_str).unwrap_or("").to_string();
        Ok(Tariffs::new(values, gst, note))
    }
}

/// Parse a catalog payload, tolerating stray characters appended after the
/// JSON body by truncating to the last closing brace and retrying.
fn parse_with_recovery(raw: &str) -> Result<Value, AppError> {
    let trimmed = raw.trim();
    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            if let Some(pos) = trimmed.rfind('}') {
                serde_json::from_str(&trimmed[..=pos]).map_err(|_| {
                    AppError::Configuration(format!("Invalid pricing payload: {}", first_err))
                })
            } else {
                Err(AppError::Configuration(format!(
                    "Invalid pricing payload: {}",
                    first_err
                )))
            }
        }
    }
}

/// Shared, read-only context handed to every rule invocation: the tariff
/// source behind its cache, plus the add-on price table.
pub struct PricingContext {
    source: Arc<dyn TariffSource>,
    cache: TariffCache,
    pub addon_prices: AddonPriceTable,
}

impl PricingContext {
    pub fn new(source: Arc<dyn TariffSource>, cache: TariffCache, addon_prices: AddonPriceTable) -> Self {
        Self { source, cache, addon_prices }
    }

    /// Resolve (or fetch from cache) the tariff table for one service.
    pub async fn tariffs(&self, spec: &ServiceTariffSpec) -> Result<Arc<Tariffs>, AppError> {
        if let Some(hit) = self.cache.get(spec.service).await {
            debug!("Tariff cache HIT for {}", spec.service);
            return Ok(hit);
        }
        debug!("Tariff cache MISS for {}", spec.service);
        let resolved = Arc::new(self.source.resolve(spec).await?);
        self.cache.insert(spec.service, resolved.clone()).await;
        Ok(resolved)
    }

    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
