//! Aggregated food search across every registered provider.
//!
//! This module provides:
//! - `QueryOrchestrator`: concurrent provider fan-out for name search and
//!   sequential, short-circuiting barcode lookup, both behind the response cache
//! - `Deduplicator`: collapses the same food reported by several providers
//! - `FoodAggregator`: the façade callers use; validates input and composes
//!   the two
//!
//! # Example
//!
//! ```ignore
//! use larder_core::{FoodAggregator, LarderConfig};
//!
//! let aggregator = FoodAggregator::from_config(&LarderConfig::default());
//! let foods = aggregator.search_by_name("greek yogurt").await?;
//! ```

mod dedup;
mod engine;
mod facade;
mod types;

pub use dedup::Deduplicator;
pub use engine::{barcode_key, search_key, QueryOrchestrator};
pub use facade::{validate_barcode, validate_query, FoodAggregator, MAX_QUERY_LEN};
pub use types::{BarcodeReport, CachedPayload, ProviderFailure, SearchReport};
