//! USDA FoodData Central.

mod types;

use crate::config::UsdaSettings;
use crate::error::ProviderError;
use crate::food::{FoodRecord, FoodSource, Macros};
use crate::utils::{canonical_barcode, fetch_json, http_client, non_negative, KJ_PER_KCAL};
use crate::FoodProvider;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use types::{SearchFood, SearchResponse};

const DEMO_KEY: &str = "DEMO_KEY";

pub struct UsdaProvider {
    client: Client,
    base_url: String,
    api_key: String,
    page_size: u32,
    timeout: Duration,
}

/// Configured key, then the environment, then the shared demo key.
fn resolve_api_key(configured: Option<&str>, from_env: Option<String>) -> String {
    configured
        .map(str::to_string)
        .filter(|k| !k.trim().is_empty())
        .or(from_env)
        .filter(|k| !k.trim().is_empty())
        .unwrap_or_else(|| DEMO_KEY.to_string())
}

impl UsdaProvider {
    pub fn new(settings: &UsdaSettings) -> Result<Self, ProviderError> {
        let timeout = Duration::from_millis(settings.timeout_ms);
        let api_key = resolve_api_key(
            settings.api_key.as_deref(),
            std::env::var("USDA_API_KEY").ok(),
        );

        Ok(Self {
            client: http_client(timeout)?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            page_size: settings.page_size.max(1),
            timeout,
        })
    }

    async fn search_foods(
        &self,
        query: &str,
        branded_only: bool,
    ) -> Result<SearchResponse, ProviderError> {
        let url = format!("{}/foods/search", self.base_url);
        let page_size = self.page_size.to_string();
        let mut params = vec![
            ("query", query),
            ("pageSize", page_size.as_str()),
            ("api_key", self.api_key.as_str()),
        ];
        if branded_only {
            params.push(("dataType", "Branded"));
        }

        let response: Option<SearchResponse> =
            fetch_json(self.client.get(&url).query(&params)).await?;
        let response = response.unwrap_or_default();
        debug!(
            target: "larder.provider.usda",
            query,
            total_hits = response.total_hits,
            returned = response.foods.len(),
            "search"
        );
        Ok(response)
    }
}

/// Translate one search hit. Figures arrive per 100 g; branded items with a
/// gram or millilitre serving are re-expressed per that serving.
fn to_record(food: &SearchFood) -> FoodRecord {
    let calories = food
        .nutrient(types::ENERGY_KCAL)
        .or_else(|| food.nutrient(types::ENERGY_ATWATER_GENERAL))
        .or_else(|| food.nutrient(types::ENERGY_ATWATER_SPECIFIC))
        .or_else(|| food.nutrient(types::ENERGY_KJ).map(|kj| kj / KJ_PER_KCAL));

    let per_100 = Macros::new(
        non_negative(calories),
        non_negative(food.nutrient(types::PROTEIN)),
        non_negative(food.nutrient(types::CARBOHYDRATE)),
        non_negative(food.nutrient(types::FAT)),
    );

    let unit = match food.serving_size_unit.as_deref().map(str::to_ascii_lowercase) {
        Some(u) if u == "ml" || u == "mlt" => "ml",
        _ => "g",
    };

    let mut record = FoodRecord::new(FoodSource::Usda, food.fdc_id.to_string(), food.description.trim())
        .with_macros(per_100)
        .with_serving(100.0, unit);

    if let Some(brand) = food.brand_owner.as_ref().or(food.brand_name.as_ref()) {
        record = record.with_brand(brand.as_str());
    }
    if let Some(upc) = &food.gtin_upc {
        record = record.with_barcode(upc.as_str());
    }

    let serving = food.serving_size.filter(|s| s.is_finite() && *s > 0.0);
    let unit_known = matches!(
        food.serving_size_unit.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("g" | "grm" | "ml" | "mlt")
    );
    match serving {
        Some(size) if food.is_branded() && unit_known => record.rescaled(size).unwrap_or(record),
        _ => record,
    }
}

#[async_trait]
impl FoodProvider for UsdaProvider {
    fn source(&self) -> FoodSource {
        FoodSource::Usda
    }

    fn description(&self) -> &'static str {
        "USDA FoodData Central"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn search(&self, query: &str) -> Result<Vec<FoodRecord>, ProviderError> {
        let response = self.search_foods(query, false).await?;
        Ok(response.foods.iter().map(to_record).collect())
    }

    async fn lookup(&self, barcode: &str) -> Result<Option<FoodRecord>, ProviderError> {
        let wanted = canonical_barcode(barcode);
        let response = self.search_foods(barcode, true).await?;
        Ok(response
            .foods
            .iter()
            .find(|food| {
                food.gtin_upc
                    .as_deref()
                    .map(|upc| canonical_barcode(upc) == wanted)
                    .unwrap_or(false)
            })
            .map(to_record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> SearchResponse {
        serde_json::from_value(json!({
            "totalHits": 2,
            "foods": [
                {
                    "fdcId": 1750340,
                    "description": "Apples, fuji, with skin, raw",
                    "dataType": "Foundation",
                    "foodNutrients": [
                        {"nutrientId": 2047, "unitName": "KCAL", "value": 63.0},
                        {"nutrientId": 1003, "unitName": "G", "value": 0.15},
                        {"nutrientId": 1004, "unitName": "G", "value": 0.16},
                        {"nutrientId": 1005, "unitName": "G", "value": 15.7}
                    ]
                },
                {
                    "fdcId": 2034567,
                    "description": "PEANUT BUTTER",
                    "dataType": "Branded",
                    "brandOwner": "Acme Foods",
                    "gtinUpc": "0051500255162",
                    "servingSize": 32.0,
                    "servingSizeUnit": "g",
                    "foodNutrients": [
                        {"nutrientId": 1008, "unitName": "KCAL", "value": 594.0},
                        {"nutrientId": 1003, "unitName": "G", "value": 21.9},
                        {"nutrientId": 1004, "unitName": "G", "value": 50.0},
                        {"nutrientId": 1005, "unitName": "G", "value": 21.9}
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_foundation_food_stays_per_100g() {
        let response = sample();
        let record = to_record(&response.foods[0]);
        assert_eq!(record.source, FoodSource::Usda);
        assert_eq!(record.source_id, "1750340");
        assert_eq!(record.calories, 63.0);
        assert_eq!(record.carbs_g, 15.7);
        assert_eq!(record.serving_size, 100.0);
        assert_eq!(record.serving_unit, "g");
        assert!(record.brand.is_none());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_branded_food_rescaled_to_serving() {
        let response = sample();
        let record = to_record(&response.foods[1]);
        assert_eq!(record.serving_size, 32.0);
        assert!((record.calories - 190.08).abs() < 1e-9);
        assert!((record.fat_g - 16.0).abs() < 1e-9);
        assert_eq!(record.brand.as_deref(), Some("Acme Foods"));
        assert_eq!(record.barcode.as_deref(), Some("0051500255162"));
    }

    #[test]
    fn test_energy_from_kilojoules() {
        let food: SearchFood = serde_json::from_value(json!({
            "fdcId": 1,
            "description": "Broth",
            "foodNutrients": [{"nutrientId": 1062, "unitName": "kJ", "value": 41.84}]
        }))
        .unwrap();
        let record = to_record(&food);
        assert!((record.calories - 10.0).abs() < 1e-9);
        assert_eq!(record.protein_g, 0.0);
    }

    #[test]
    fn test_missing_nutrients_are_zero_not_negative() {
        let food: SearchFood = serde_json::from_value(json!({
            "fdcId": 7,
            "description": "Water",
            "foodNutrients": [{"nutrientId": 1003, "value": -1.0}]
        }))
        .unwrap();
        let record = to_record(&food);
        assert_eq!(record.protein_g, 0.0);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_api_key_falls_back_to_demo() {
        assert_eq!(resolve_api_key(None, None), DEMO_KEY);
        assert_eq!(resolve_api_key(Some("  "), Some(String::new())), DEMO_KEY);
        assert_eq!(resolve_api_key(None, Some("from-env".to_string())), "from-env");
        assert_eq!(
            resolve_api_key(Some("from-config"), Some("from-env".to_string())),
            "from-config"
        );
    }

    #[test]
    fn test_configured_api_key_used() {
        let settings = UsdaSettings {
            api_key: Some("from-config".to_string()),
            ..UsdaSettings::default()
        };
        let provider = UsdaProvider::new(&settings).unwrap();
        assert_eq!(provider.api_key, "from-config");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        let settings = UsdaSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_ms: 500,
            ..UsdaSettings::default()
        };
        let provider = UsdaProvider::new(&settings).unwrap();
        assert!(provider.search("apple").await.is_err());
    }
}
