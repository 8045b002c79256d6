//! In-memory caching using moka
//!
//! Caches resolved tariff tables per service so the remote catalog is not
//! re-fetched on every quote. Tariffs change at the source, so entries are
//! TTL-bounded and the whole cache can be dropped via the invalidate
//! endpoint.

use moka::future::Cache;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::pricing::tariffs::Tariffs;

/// TTL-bounded cache of resolved tariff tables (service key -> Tariffs).
///
/// A TTL of zero disables caching entirely; every quote then hits the
/// source directly.
#[derive(Clone)]
pub struct TariffCache {
    entries: Option<Cache<String, Arc<Tariffs>>>,
}

impl TariffCache {
    pub fn new(ttl_secs: u64) -> Self {
        let entries = if ttl_secs == 0 {
            None
        } else {
            Some(
                Cache::builder()
                    // One entry per service; the catalog is small.
                    .max_capacity(64)
                    .time_to_live(Duration::from_secs(ttl_secs))
                    .build(),
            )
        };
        Self { entries }
    }

    pub async fn get(&self, service: &str) -> Option<Arc<Tariffs>> {
        match &self.entries {
            Some(cache) => cache.get(service).await,
            None => None,
        }
    }

    pub async fn insert(&self, service: &str, tariffs: Arc<Tariffs>) {
        if let Some(cache) = &self.entries {
            cache.insert(service.to_string(), tariffs).await;
        }
    }

    /// Drop every cached table (tariffs changed at the source).
    pub fn invalidate_all(&self) {
        if let Some(cache) = &self.entries {
            cache.invalidate_all();
            info!("Tariff cache invalidated");
        }
    }

    /// Cache statistics for the monitoring endpoint
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            enabled: self.entries.is_some(),
            entry_count: self.entries.as_ref().map(|c| c.entry_count()).unwrap_or(0),
        }
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub entry_count: u64,
}
