//! The entry point callers use for food search.

use super::{BarcodeReport, CachedPayload, Deduplicator, QueryOrchestrator, SearchReport};
use crate::cache::{Clock, ResponseCache, SystemClock};
use crate::config::LarderConfig;
use crate::error::SearchError;
use crate::food::FoodRecord;
use crate::{build_registry, ProviderInfo, ProviderRegistry};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Longest accepted search query, in characters.
pub const MAX_QUERY_LEN: usize = 200;

/// Trim and check a free-text query.
pub fn validate_query(query: &str) -> Result<&str, SearchError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(SearchError::EmptyQuery);
    }
    if trimmed.chars().count() > MAX_QUERY_LEN {
        return Err(SearchError::QueryTooLong { max: MAX_QUERY_LEN });
    }
    Ok(trimmed)
}

/// Trim and check a barcode: EAN-8, UPC-A, EAN-13 or GTIN-14.
pub fn validate_barcode(code: &str) -> Result<&str, SearchError> {
    let trimmed = code.trim();
    let digits_only = !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit());
    if !digits_only || !matches!(trimmed.len(), 8 | 12 | 13 | 14) {
        return Err(SearchError::InvalidBarcode(trimmed.to_string()));
    }
    Ok(trimmed)
}

/// Validates input, runs the orchestrator and deduplicates its output.
///
/// Only the orchestrator's combined output is cached; deduplication runs on
/// every call, cache hit or not, so changing priority or thresholds never
/// needs a cache flush.
pub struct FoodAggregator {
    orchestrator: QueryOrchestrator,
    dedup: Deduplicator,
    sweeper: Option<JoinHandle<()>>,
}

impl FoodAggregator {
    /// Build from configuration, registering every usable provider.
    pub fn from_config(config: &LarderConfig) -> Self {
        Self::new(build_registry(config), config)
    }

    pub fn new(registry: ProviderRegistry, config: &LarderConfig) -> Self {
        Self::with_clock(registry, config, Arc::new(SystemClock))
    }

    /// Like [`FoodAggregator::new`] with an injected clock for the cache.
    ///
    /// The periodic sweeper is started when a tokio runtime is running.
    pub fn with_clock(
        registry: ProviderRegistry,
        config: &LarderConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache: Arc<ResponseCache<CachedPayload>> =
            Arc::new(ResponseCache::new(clock, config.cache.sweep_interval()));

        let sweeper = match tokio::runtime::Handle::try_current() {
            Ok(_) => Some(cache.spawn_sweeper()),
            Err(_) => {
                debug!(target: "larder.aggregator", "no runtime; cache sweeper not started");
                None
            }
        };

        let orchestrator = QueryOrchestrator::new(
            Arc::new(registry),
            cache,
            config.priority.clone(),
            config.cache.search_ttl(),
            config.cache.barcode_ttl(),
        );

        Self {
            orchestrator,
            dedup: Deduplicator::new(config.priority.clone(), config.similarity),
            sweeper,
        }
    }

    pub fn orchestrator(&self) -> &QueryOrchestrator {
        &self.orchestrator
    }

    pub fn deduplicator(&self) -> &Deduplicator {
        &self.dedup
    }

    pub fn cache(&self) -> &Arc<ResponseCache<CachedPayload>> {
        self.orchestrator.cache()
    }

    /// Registered providers, highest priority first.
    pub fn providers(&self) -> Vec<ProviderInfo> {
        self.orchestrator
            .registry()
            .list_providers(self.orchestrator.priority())
    }

    /// Deduplicated records for `query`. Provider failures reduce the result
    /// set; they are never returned as errors.
    pub async fn search_by_name(&self, query: &str) -> Result<Vec<FoodRecord>, SearchError> {
        Ok(self.search_by_name_detailed(query).await?.records)
    }

    /// Like [`FoodAggregator::search_by_name`], keeping the per-provider
    /// report.
    pub async fn search_by_name_detailed(&self, query: &str) -> Result<SearchReport, SearchError> {
        let query = validate_query(query)?;
        let mut report = self.orchestrator.search(query).await;
        let combined = std::mem::take(&mut report.records);
        report.records = self.dedup.dedupe(combined);
        Ok(report)
    }

    pub async fn search_by_barcode(&self, code: &str) -> Result<Option<FoodRecord>, SearchError> {
        Ok(self.search_by_barcode_detailed(code).await?.record)
    }

    pub async fn search_by_barcode_detailed(&self, code: &str) -> Result<BarcodeReport, SearchError> {
        let code = validate_barcode(code)?;
        Ok(self.orchestrator.lookup_by_barcode(code).await)
    }
}

impl Drop for FoodAggregator {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}
