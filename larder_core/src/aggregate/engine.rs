//! Query execution against the provider set.
//!
//! Name searches fan out to every provider in parallel, each bounded by its
//! own timeout. Barcode lookups walk providers in priority order and stop at
//! the first hit. Both consult the shared response cache first.

use super::{BarcodeReport, CachedPayload, SearchReport};
use crate::cache::ResponseCache;
use crate::error::ProviderError;
use crate::food::{FoodRecord, FoodSource, SourcePriority};
use crate::{FoodProvider, ProviderRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Cache key for a name search. Case and whitespace differences share an entry.
pub fn search_key(query: &str) -> String {
    let collapsed = query.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("search:{}", collapsed.to_lowercase())
}

pub fn barcode_key(barcode: &str) -> String {
    format!("barcode:{}", barcode.trim())
}

pub struct QueryOrchestrator {
    registry: Arc<ProviderRegistry>,
    cache: Arc<ResponseCache<CachedPayload>>,
    priority: SourcePriority,
    search_ttl: Duration,
    barcode_ttl: Duration,
}

impl QueryOrchestrator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        cache: Arc<ResponseCache<CachedPayload>>,
        priority: SourcePriority,
        search_ttl: Duration,
        barcode_ttl: Duration,
    ) -> Self {
        Self {
            registry,
            cache,
            priority,
            search_ttl,
            barcode_ttl,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<ResponseCache<CachedPayload>> {
        &self.cache
    }

    pub fn priority(&self) -> &SourcePriority {
        &self.priority
    }

    /// Search every provider concurrently and concatenate what they return.
    ///
    /// Failing providers contribute nothing and are listed in the report.
    /// The combined, not yet deduplicated, records are cached unless every
    /// provider failed.
    pub async fn search(&self, query: &str) -> SearchReport {
        let start = Instant::now();
        let key = search_key(query);

        if let Some(CachedPayload::Search(records)) = self.cache.get(&key) {
            debug!(target: "larder.orchestrator", key = %key, records = records.len(), "search cache hit");
            let mut report = SearchReport::from_cache(query, records);
            report.duration_ms = Some(start.elapsed().as_millis() as u64);
            return report;
        }
        debug!(target: "larder.orchestrator", key = %key, "search cache miss");

        let providers = self.registry.ordered(&self.priority);
        let futures: Vec<_> = providers
            .iter()
            .map(|provider| {
                let provider = Arc::clone(provider);
                let query = query.to_string();
                async move {
                    let source = provider.source();
                    let limit = provider.timeout();
                    let result = match timeout(limit, provider.search(&query)).await {
                        Ok(result) => result,
                        Err(_) => Err(ProviderError::Timeout(limit)),
                    };
                    (source, result)
                }
            })
            .collect();

        // Results come back in priority order regardless of completion order.
        let results = futures::future::join_all(futures).await;

        let mut report = SearchReport::new(query);
        for (source, result) in results {
            match result {
                Ok(records) => {
                    let (valid, dropped) = keep_valid(source, records);
                    report.dropped += dropped;
                    report.add_source(source, valid);
                }
                Err(e) => {
                    warn!(
                        target: "larder.orchestrator",
                        source = %source,
                        code = e.code_str(),
                        is_timeout = e.is_timeout(),
                        error = %e,
                        "provider search failed"
                    );
                    report.add_failure(source, &e);
                }
            }
        }

        if report.all_failed() {
            debug!(target: "larder.orchestrator", key = %key, "every provider failed; not caching");
        } else {
            self.cache.set(
                key,
                CachedPayload::Search(report.records.clone()),
                self.search_ttl,
            );
        }

        report.duration_ms = Some(start.elapsed().as_millis() as u64);
        report
    }

    /// Try providers one at a time in priority order; the first hit wins and
    /// later providers are not contacted. Only hits are cached.
    pub async fn lookup_by_barcode(&self, barcode: &str) -> BarcodeReport {
        let start = Instant::now();
        let barcode = barcode.trim();
        let key = barcode_key(barcode);
        let mut report = BarcodeReport::new(barcode);

        if let Some(CachedPayload::Barcode(record)) = self.cache.get(&key) {
            debug!(target: "larder.orchestrator", key = %key, "barcode cache hit");
            report.record = Some(record);
            report.cached = true;
            report.duration_ms = Some(start.elapsed().as_millis() as u64);
            return report;
        }

        for provider in self.registry.ordered(&self.priority) {
            let source = provider.source();
            report.attempted.push(source);

            match lookup_one(provider.as_ref(), barcode).await {
                Ok(Some(record)) => match record.validate() {
                    Ok(()) => {
                        debug!(target: "larder.orchestrator", source = %source, barcode, "barcode hit");
                        self.cache.set(
                            key.clone(),
                            CachedPayload::Barcode(record.clone()),
                            self.barcode_ttl,
                        );
                        report.record = Some(record);
                        break;
                    }
                    Err(reason) => {
                        debug!(target: "larder.orchestrator", source = %source, %reason, "dropping invalid barcode hit");
                    }
                },
                Ok(None) => {
                    debug!(target: "larder.orchestrator", source = %source, barcode, "barcode not found");
                }
                Err(e) => {
                    warn!(
                        target: "larder.orchestrator",
                        source = %source,
                        code = e.code_str(),
                        is_timeout = e.is_timeout(),
                        error = %e,
                        "provider lookup failed"
                    );
                    report.failures.push(super::ProviderFailure::from_error(source, &e));
                }
            }
        }

        report.duration_ms = Some(start.elapsed().as_millis() as u64);
        report
    }
}

async fn lookup_one(
    provider: &dyn FoodProvider,
    barcode: &str,
) -> Result<Option<FoodRecord>, ProviderError> {
    let limit = provider.timeout();
    match timeout(limit, provider.lookup(barcode)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(limit)),
    }
}

/// Split off records that break the canonical record invariants.
fn keep_valid(source: FoodSource, records: Vec<FoodRecord>) -> (Vec<FoodRecord>, usize) {
    let total = records.len();
    let valid: Vec<FoodRecord> = records
        .into_iter()
        .filter(|record| match record.validate() {
            Ok(()) => true,
            Err(reason) => {
                debug!(
                    target: "larder.orchestrator",
                    source = %source,
                    source_id = %record.source_id,
                    %reason,
                    "dropping invalid record"
                );
                false
            }
        })
        .collect();
    let dropped = total - valid.len();
    (valid, dropped)
}
