use async_trait::async_trait;
use larder_core::config::{OpenFoodFactsSettings, UsdaSettings};
use larder_core::error::ProviderError;
use larder_core::providers::open_food_facts::OpenFoodFactsProvider;
use larder_core::providers::usda::UsdaProvider;
use larder_core::{
    FoodAggregator, FoodProvider, FoodRecord, FoodSource, LarderConfig, Macros, ManualClock,
    ProviderRegistry, SourcePriority,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Test double with scripted answers and call counters.
struct StubProvider {
    source: FoodSource,
    search_result: Option<Vec<FoodRecord>>,
    lookup_result: Option<Option<FoodRecord>>,
    search_calls: AtomicUsize,
    lookup_calls: AtomicUsize,
}

impl StubProvider {
    fn new(source: FoodSource) -> Self {
        Self {
            source,
            search_result: Some(Vec::new()),
            lookup_result: Some(None),
            search_calls: AtomicUsize::new(0),
            lookup_calls: AtomicUsize::new(0),
        }
    }

    fn returning(mut self, records: Vec<FoodRecord>) -> Self {
        self.search_result = Some(records);
        self
    }

    fn with_hit(mut self, record: FoodRecord) -> Self {
        self.lookup_result = Some(Some(record));
        self
    }

    /// Every call fails with an upstream error.
    fn failing(mut self) -> Self {
        self.search_result = None;
        self.lookup_result = None;
        self
    }

    fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn lookups(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }
}

fn outage() -> ProviderError {
    ProviderError::Status {
        status: 503,
        body: "service unavailable".to_string(),
    }
}

#[async_trait]
impl FoodProvider for StubProvider {
    fn source(&self) -> FoodSource {
        self.source
    }

    fn description(&self) -> &'static str {
        "stub"
    }

    async fn search(&self, _query: &str) -> Result<Vec<FoodRecord>, ProviderError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.search_result.clone().ok_or_else(outage)
    }

    async fn lookup(&self, _barcode: &str) -> Result<Option<FoodRecord>, ProviderError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.lookup_result.clone().ok_or_else(outage)
    }
}

fn food(source: FoodSource, id: &str, name: &str, calories: f64) -> FoodRecord {
    FoodRecord::new(source, id, name).with_macros(Macros::new(calories, 0.3, 14.0, 0.2))
}

fn aggregator(stubs: &[Arc<StubProvider>], config: &LarderConfig) -> FoodAggregator {
    let mut registry = ProviderRegistry::new();
    for stub in stubs {
        registry.register_provider(stub.clone());
    }
    FoodAggregator::new(registry, config)
}

fn identities(records: &[FoodRecord]) -> HashSet<(FoodSource, String)> {
    records
        .iter()
        .map(|r| (r.source, r.source_id.clone()))
        .collect()
}

#[tokio::test]
async fn test_all_providers_down_returns_empty() {
    let unreachable = "http://127.0.0.1:9".to_string();
    let usda = UsdaProvider::new(&UsdaSettings {
        base_url: unreachable.clone(),
        timeout_ms: 1_000,
        ..UsdaSettings::default()
    })
    .unwrap();
    let off = OpenFoodFactsProvider::new(&OpenFoodFactsSettings {
        base_url: unreachable,
        timeout_ms: 1_000,
        ..OpenFoodFactsSettings::default()
    })
    .unwrap();

    let mut registry = ProviderRegistry::new();
    registry.register_provider(Arc::new(usda));
    registry.register_provider(Arc::new(off));
    registry.register_provider(Arc::new(StubProvider::new(FoodSource::Nutritionix).failing()));
    let aggregator = FoodAggregator::new(registry, &LarderConfig::default());

    let records = aggregator.search_by_name("apple").await.unwrap();
    assert!(records.is_empty());

    let report = aggregator.search_by_name_detailed("apple").await.unwrap();
    assert!(report.all_failed());
    assert_eq!(report.failures.len(), 3);

    assert_eq!(aggregator.search_by_barcode("3017620422003").await.unwrap(), None);
}

#[tokio::test]
async fn test_second_search_served_from_cache() {
    let usda = Arc::new(
        StubProvider::new(FoodSource::Usda)
            .returning(vec![food(FoodSource::Usda, "171688", "Apple, raw", 52.0)]),
    );
    let off = Arc::new(StubProvider::new(FoodSource::OpenFoodFacts).returning(vec![
        food(FoodSource::OpenFoodFacts, "111", "Apple juice", 46.0),
        food(FoodSource::OpenFoodFacts, "222", "Apple pie", 237.0),
    ]));
    let aggregator = aggregator(&[usda.clone(), off.clone()], &LarderConfig::default());

    let first = aggregator.search_by_name("apple").await.unwrap();
    let second = aggregator.search_by_name("apple").await.unwrap();

    assert_eq!(usda.searches(), 1);
    assert_eq!(off.searches(), 1);
    assert_eq!(identities(&first), identities(&second));
    assert_eq!(first.len(), 3);
}

#[tokio::test]
async fn test_cache_expiry_refetches() {
    let usda = Arc::new(
        StubProvider::new(FoodSource::Usda)
            .returning(vec![food(FoodSource::Usda, "1", "Apple", 52.0)]),
    );
    let clock = Arc::new(ManualClock::new());
    let config = LarderConfig::default();
    let mut registry = ProviderRegistry::new();
    registry.register_provider(usda.clone());
    let aggregator = FoodAggregator::with_clock(registry, &config, clock.clone());

    aggregator.search_by_name("apple").await.unwrap();
    clock.advance(config.cache.search_ttl() - Duration::from_millis(1));
    aggregator.search_by_name("apple").await.unwrap();
    assert_eq!(usda.searches(), 1);

    clock.advance(Duration::from_millis(1));
    aggregator.search_by_name("apple").await.unwrap();
    assert_eq!(usda.searches(), 2);
}

#[tokio::test]
async fn test_near_identical_apples_collapse_to_higher_priority() {
    // A outranks B
    let config = LarderConfig {
        priority: SourcePriority::new(vec![FoodSource::Usda, FoodSource::OpenFoodFacts]),
        ..LarderConfig::default()
    };
    let a = Arc::new(
        StubProvider::new(FoodSource::Usda)
            .returning(vec![food(FoodSource::Usda, "a-1", "Apple", 52.0)]),
    );
    let b = Arc::new(
        StubProvider::new(FoodSource::OpenFoodFacts)
            .returning(vec![food(FoodSource::OpenFoodFacts, "b-1", "Apple", 53.0)]),
    );

    // Registration order must not matter.
    let aggregator = aggregator(&[b, a], &config);
    let records = aggregator.search_by_name("apple").await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, FoodSource::Usda);
    assert_eq!(records[0].source_id, "a-1");
}

#[tokio::test]
async fn test_same_name_different_nutrition_both_kept() {
    let usda = Arc::new(
        StubProvider::new(FoodSource::Usda)
            .returning(vec![food(FoodSource::Usda, "1", "Greek yogurt", 59.0)]),
    );
    let nix = Arc::new(
        StubProvider::new(FoodSource::Nutritionix)
            .returning(vec![food(FoodSource::Nutritionix, "2", "Greek yogurt", 97.0)]),
    );
    let aggregator = aggregator(&[usda, nix], &LarderConfig::default());

    let records = aggregator.search_by_name("greek yogurt").await.unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_partial_failure_keeps_other_results() {
    let usda = Arc::new(StubProvider::new(FoodSource::Usda).failing());
    let off = Arc::new(
        StubProvider::new(FoodSource::OpenFoodFacts)
            .returning(vec![food(FoodSource::OpenFoodFacts, "1", "Oat milk", 46.0)]),
    );
    let aggregator = aggregator(&[usda, off], &LarderConfig::default());

    let report = aggregator.search_by_name_detailed("oat milk").await.unwrap();
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.completed, vec![FoodSource::OpenFoodFacts]);
    assert_eq!(report.failures[0].source, FoodSource::Usda);
    assert_eq!(report.failures[0].code, "upstream_error");
}

#[tokio::test]
async fn test_barcode_lookup_stops_at_first_hit() {
    let config = LarderConfig {
        priority: SourcePriority::new(vec![
            FoodSource::Local,
            FoodSource::Usda,
            FoodSource::OpenFoodFacts,
        ]),
        ..LarderConfig::default()
    };
    let a = Arc::new(StubProvider::new(FoodSource::Local));
    let b = Arc::new(
        StubProvider::new(FoodSource::Usda)
            .with_hit(food(FoodSource::Usda, "2034567", "Peanut butter", 594.0)),
    );
    let c = Arc::new(
        StubProvider::new(FoodSource::OpenFoodFacts)
            .with_hit(food(FoodSource::OpenFoodFacts, "0051500255162", "Peanut butter", 590.0)),
    );
    let aggregator = aggregator(&[a.clone(), b.clone(), c.clone()], &config);

    let hit = aggregator
        .search_by_barcode("0051500255162")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hit.source, FoodSource::Usda);
    assert_eq!((a.lookups(), b.lookups(), c.lookups()), (1, 1, 0));

    // served from cache
    let again = aggregator.search_by_barcode("0051500255162").await.unwrap();
    assert_eq!(again, Some(hit));
    assert_eq!((a.lookups(), b.lookups(), c.lookups()), (1, 1, 0));
}

#[tokio::test]
async fn test_barcode_failure_falls_through_and_misses_are_not_cached() {
    let a = Arc::new(StubProvider::new(FoodSource::Local).failing());
    let b = Arc::new(StubProvider::new(FoodSource::Usda));
    let aggregator = aggregator(&[a.clone(), b.clone()], &LarderConfig::default());

    let report = aggregator
        .search_by_barcode_detailed("12345670")
        .await
        .unwrap();
    assert!(report.record.is_none());
    assert_eq!(report.attempted, vec![FoodSource::Local, FoodSource::Usda]);
    assert_eq!(report.failures.len(), 1);

    aggregator.search_by_barcode("12345670").await.unwrap();
    assert_eq!((a.lookups(), b.lookups()), (2, 2));
}

#[tokio::test]
async fn test_malformed_input_contacts_no_provider() {
    let usda = Arc::new(StubProvider::new(FoodSource::Usda));
    let aggregator = aggregator(&[usda.clone()], &LarderConfig::default());

    assert!(aggregator.search_by_name("   ").await.is_err());
    assert!(aggregator.search_by_barcode("12-34").await.is_err());
    assert_eq!((usda.searches(), usda.lookups()), (0, 0));
}

#[tokio::test]
async fn test_dropped_search_abandons_providers() {
    struct Hanging;

    #[async_trait]
    impl FoodProvider for Hanging {
        fn source(&self) -> FoodSource {
            FoodSource::Usda
        }

        fn description(&self) -> &'static str {
            "hangs"
        }

        async fn search(&self, _query: &str) -> Result<Vec<FoodRecord>, ProviderError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        async fn lookup(&self, _barcode: &str) -> Result<Option<FoodRecord>, ProviderError> {
            Ok(None)
        }
    }

    let mut registry = ProviderRegistry::new();
    registry.register_provider(Arc::new(Hanging));
    let aggregator = FoodAggregator::new(registry, &LarderConfig::default());

    let outcome =
        tokio::time::timeout(Duration::from_millis(50), aggregator.search_by_name("apple")).await;
    assert!(outcome.is_err());
    // nothing was cached for the abandoned query
    assert!(aggregator.cache().is_empty());
}
