//! Open Food Facts, the crowd-sourced product database.

mod types;

use crate::config::OpenFoodFactsSettings;
use crate::error::ProviderError;
use crate::food::{FoodRecord, FoodSource, Macros};
use crate::utils::{fetch_json, http_client, non_negative, KJ_PER_KCAL};
use crate::FoodProvider;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use types::{Product, ProductResponse, SearchResponse, SEARCH_FIELDS};

static VOLUME_QUANTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d\s*(ml|cl|dl|l)\b").unwrap());

pub struct OpenFoodFactsProvider {
    client: Client,
    base_url: String,
    page_size: u32,
    timeout: Duration,
}

impl OpenFoodFactsProvider {
    pub fn new(settings: &OpenFoodFactsSettings) -> Result<Self, ProviderError> {
        let timeout = Duration::from_millis(settings.timeout_ms);
        Ok(Self {
            client: http_client(timeout)?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            page_size: settings.page_size.max(1),
            timeout,
        })
    }
}

fn serving_unit(quantity: Option<&str>) -> &'static str {
    match quantity {
        Some(q) if VOLUME_QUANTITY.is_match(q) => "ml",
        _ => "g",
    }
}

/// Translate a product. Figures are always per 100 g or 100 ml.
fn to_record(product: &Product) -> FoodRecord {
    let n = &product.nutriments;
    let calories = n
        .energy_kcal_100g
        .or_else(|| n.energy_kj_100g.map(|kj| kj / KJ_PER_KCAL));

    let mut record = FoodRecord::new(
        FoodSource::OpenFoodFacts,
        product.code.as_deref().unwrap_or_default().trim(),
        product.display_name().unwrap_or_default(),
    )
    .with_macros(Macros::new(
        non_negative(calories),
        non_negative(n.proteins_100g),
        non_negative(n.carbohydrates_100g),
        non_negative(n.fat_100g),
    ))
    .with_serving(100.0, serving_unit(product.quantity.as_deref()));

    if let Some(brand) = product.primary_brand() {
        record = record.with_brand(brand);
    }
    if let Some(code) = &product.code {
        record = record.with_barcode(code.as_str());
    }
    record
}

#[async_trait]
impl FoodProvider for OpenFoodFactsProvider {
    fn source(&self) -> FoodSource {
        FoodSource::OpenFoodFacts
    }

    fn description(&self) -> &'static str {
        "Open Food Facts crowd-sourced product database"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn search(&self, query: &str) -> Result<Vec<FoodRecord>, ProviderError> {
        let url = format!("{}/cgi/search.pl", self.base_url);
        let page_size = self.page_size.to_string();
        let request = self.client.get(&url).query(&[
            ("search_terms", query),
            ("search_simple", "1"),
            ("action", "process"),
            ("json", "1"),
            ("page_size", page_size.as_str()),
            ("fields", SEARCH_FIELDS),
        ]);

        let response: SearchResponse = fetch_json(request).await?.unwrap_or_default();
        debug!(
            target: "larder.provider.open_food_facts",
            query,
            count = response.count.unwrap_or_default(),
            returned = response.products.len(),
            "search"
        );
        Ok(response.products.iter().map(to_record).collect())
    }

    async fn lookup(&self, barcode: &str) -> Result<Option<FoodRecord>, ProviderError> {
        let url = format!("{}/api/v2/product/{}.json", self.base_url, barcode.trim());
        let response: Option<ProductResponse> = fetch_json(self.client.get(&url)).await?;

        Ok(match response {
            Some(ProductResponse {
                status: 1,
                product: Some(mut product),
            }) => {
                if product.code.as_deref().map_or(true, |c| c.trim().is_empty()) {
                    product.code = Some(barcode.trim().to_string());
                }
                Some(to_record(&product))
            }
            _ => None,
        })
    }
}
