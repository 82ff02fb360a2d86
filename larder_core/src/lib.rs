// src/lib.rs
pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod fitness;
pub mod food;
pub mod providers;
pub mod similarity;
pub mod utils;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use crate::aggregate::{
    BarcodeReport, CachedPayload, Deduplicator, FoodAggregator, ProviderFailure, QueryOrchestrator,
    SearchReport,
};
pub use crate::cache::{Clock, ManualClock, ResponseCache, SystemClock};
pub use crate::config::{ConfigStore, LarderConfig};
use crate::error::ProviderError;
pub use crate::food::{FoodRecord, FoodSource, Macros, SourcePriority};
pub use crate::similarity::SimilarityConfig;

/// Default outbound timeout for a provider call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

/// One external food database.
///
/// Adapters translate their provider's payloads into [`FoodRecord`]s and
/// report failures as [`ProviderError`]. They never panic on bad upstream
/// data; the orchestrator decides what a failure means for the caller.
#[async_trait]
pub trait FoodProvider: Send + Sync {
    /// The provenance tag stamped on every record this provider returns.
    fn source(&self) -> FoodSource;

    /// Returns a description of the provider.
    fn description(&self) -> &'static str;

    /// Upper bound on a single call to this provider.
    fn timeout(&self) -> Duration {
        DEFAULT_PROVIDER_TIMEOUT
    }

    /// Free-text search.
    async fn search(&self, query: &str) -> Result<Vec<FoodRecord>, ProviderError>;

    /// Barcode lookup. `Ok(None)` means the provider does not know the code.
    async fn lookup(&self, barcode: &str) -> Result<Option<FoodRecord>, ProviderError>;
}

pub struct ProviderRegistry {
    pub providers: HashMap<FoodSource, Arc<dyn FoodProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        ProviderRegistry {
            providers: HashMap::new(),
        }
    }

    pub fn register_provider(&mut self, provider: Arc<dyn FoodProvider>) {
        self.providers.insert(provider.source(), provider);
    }

    pub fn get_provider(&self, source: FoodSource) -> Option<&Arc<dyn FoodProvider>> {
        self.providers.get(&source)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Registered providers, highest priority first.
    pub fn ordered(&self, priority: &SourcePriority) -> Vec<Arc<dyn FoodProvider>> {
        priority
            .ordered()
            .into_iter()
            .filter_map(|source| self.providers.get(&source).cloned())
            .collect()
    }

    pub fn list_providers(&self, priority: &SourcePriority) -> Vec<ProviderInfo> {
        self.ordered(priority)
            .iter()
            .map(|p| ProviderInfo {
                source: p.source(),
                description: p.description().to_string(),
                timeout_ms: p.timeout().as_millis() as u64,
                priority: priority.rank(p.source()),
            })
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub source: FoodSource,
    pub description: String,
    pub timeout_ms: u64,
    pub priority: usize,
}

/// Build a registry from configuration, registering every enabled provider
/// that has the credentials it needs.
pub fn build_registry(config: &LarderConfig) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    let settings = &config.providers;

    if settings.local.enabled {
        match providers::local::LocalProvider::from_settings(&settings.local) {
            Ok(provider) => registry.register_provider(Arc::new(provider)),
            Err(e) => tracing::warn!(target: "larder.registry", error = %e, "local catalog unavailable"),
        }
    }

    if settings.usda.enabled {
        match providers::usda::UsdaProvider::new(&settings.usda) {
            Ok(provider) => registry.register_provider(Arc::new(provider)),
            Err(e) => tracing::warn!(target: "larder.registry", error = %e, "usda provider disabled"),
        }
    }

    if settings.nutritionix.enabled {
        match providers::nutritionix::NutritionixProvider::new(&settings.nutritionix) {
            Ok(provider) => registry.register_provider(Arc::new(provider)),
            Err(e) => {
                tracing::info!(target: "larder.registry", error = %e, "nutritionix provider disabled")
            }
        }
    }

    if settings.open_food_facts.enabled {
        match providers::open_food_facts::OpenFoodFactsProvider::new(&settings.open_food_facts) {
            Ok(provider) => registry.register_provider(Arc::new(provider)),
            Err(e) => {
                tracing::warn!(target: "larder.registry", error = %e, "open food facts provider disabled")
            }
        }
    }

    registry
}
