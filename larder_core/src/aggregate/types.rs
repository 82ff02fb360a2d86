//! Result and cache types shared by the orchestrator and the façade.

use crate::error::ProviderError;
use crate::food::{FoodRecord, FoodSource};
use serde::{Deserialize, Serialize};

/// What the response cache stores for food queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CachedPayload {
    /// Combined provider output for a name search, before deduplication
    Search(Vec<FoodRecord>),
    /// The first hit of a barcode lookup
    Barcode(FoodRecord),
}

/// A provider that failed during a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub source: FoodSource,

    /// Error message
    pub error: String,

    /// Stable machine-readable code (`timeout`, `upstream_error`, ...)
    pub code: String,

    /// Whether this was a timeout
    #[serde(default)]
    pub is_timeout: bool,
}

impl ProviderFailure {
    pub fn from_error(source: FoodSource, error: &ProviderError) -> Self {
        Self {
            source,
            error: error.to_string(),
            code: error.code_str().to_string(),
            is_timeout: error.is_timeout(),
        }
    }
}

/// Outcome of a name search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    /// The normalized query
    pub query: String,

    /// Records returned. Combined provider output from the orchestrator;
    /// deduplicated when produced by the façade.
    pub records: Vec<FoodRecord>,

    /// Providers that answered (possibly with nothing)
    pub completed: Vec<FoodSource>,

    /// Providers that failed or timed out
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ProviderFailure>,

    /// Records refused at the orchestrator boundary
    #[serde(default)]
    pub dropped: usize,

    /// Whether the records came from the response cache
    #[serde(default)]
    pub cached: bool,

    /// Total time taken (ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl SearchReport {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            records: Vec::new(),
            completed: Vec::new(),
            failures: Vec::new(),
            dropped: 0,
            cached: false,
            duration_ms: None,
        }
    }

    pub fn from_cache(query: impl Into<String>, records: Vec<FoodRecord>) -> Self {
        Self {
            records,
            cached: true,
            ..Self::new(query)
        }
    }

    pub fn add_source(&mut self, source: FoodSource, records: Vec<FoodRecord>) {
        self.completed.push(source);
        self.records.extend(records);
    }

    pub fn add_failure(&mut self, source: FoodSource, error: &ProviderError) {
        self.failures.push(ProviderFailure::from_error(source, error));
    }

    /// Check if any provider failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Check if every provider failed. A cached report never has failures.
    pub fn all_failed(&self) -> bool {
        self.completed.is_empty() && !self.failures.is_empty()
    }
}

/// Outcome of a barcode lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarcodeReport {
    pub barcode: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<FoodRecord>,

    /// Providers consulted, in the order they were tried
    pub attempted: Vec<FoodSource>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ProviderFailure>,

    #[serde(default)]
    pub cached: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl BarcodeReport {
    pub fn new(barcode: impl Into<String>) -> Self {
        Self {
            barcode: barcode.into(),
            record: None,
            attempted: Vec::new(),
            failures: Vec::new(),
            cached: false,
            duration_ms: None,
        }
    }
}
