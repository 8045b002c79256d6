//! Quote engine for property-inspection services.
//!
//! A thin axum dispatcher resolves a requested service identifier to its
//! statically registered pricing rule and invokes it with normalized
//! parameters. Tariffs come from the environment or a remote services
//! catalog, behind a TTL-bounded cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod pricing;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use crate::cache::TariffCache;
use crate::config::{Settings, TariffSourceKind};
use crate::error::AppError;
use crate::pricing::addons::AddonPriceTable;
use crate::pricing::{
    CatalogTariffSource, EnvTariffSource, PricingContext, ServiceRegistry, TariffSource,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ServiceRegistry>,
    pub pricing: Arc<PricingContext>,
}

impl AppState {
    /// Build the state from settings: pick the tariff source, snapshot the
    /// add-on price table, and register every service.
    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let source: Arc<dyn TariffSource> = match settings.tariff_source {
            TariffSourceKind::Env => Arc::new(EnvTariffSource::from_env()),
            TariffSourceKind::Catalog => {
                let base_url = settings.catalog_url.clone().ok_or_else(|| {
                    AppError::Configuration(
                        "KONG_GATEWAY_URL is not set in environment or .env".to_string(),
                    )
                })?;
                Arc::new(CatalogTariffSource::new(
                    base_url,
                    Duration::from_secs(settings.catalog_timeout_secs),
                )?)
            }
        };

        let pricing = PricingContext::new(
            source,
            TariffCache::new(settings.tariff_cache_ttl_secs),
            AddonPriceTable::from_env(),
        );

        Ok(Self {
            registry: Arc::new(ServiceRegistry::with_default_services()),
            pricing: Arc::new(pricing),
        })
    }

    /// State with explicit collaborators (tests, embedding).
    pub fn new(registry: ServiceRegistry, pricing: PricingContext) -> Self {
        Self { registry: Arc::new(registry), pricing: Arc::new(pricing) }
    }
}
