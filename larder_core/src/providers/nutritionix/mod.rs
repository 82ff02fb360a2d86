//! Nutritionix, the commercial nutrition database.

mod types;

use crate::config::NutritionixSettings;
use crate::error::ProviderError;
use crate::food::{FoodRecord, FoodSource, Macros};
use crate::utils::{fetch_json, http_client, non_negative};
use crate::FoodProvider;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::debug;
use types::{InstantResponse, Item, ItemResponse};

pub struct NutritionixProvider {
    client: Client,
    base_url: String,
    app_id: String,
    app_key: String,
    page_size: usize,
    timeout: Duration,
}

fn credential(configured: &Option<String>, env_var: &str) -> Option<String> {
    configured
        .clone()
        .or_else(|| std::env::var(env_var).ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl NutritionixProvider {
    /// Fails with [`ProviderError::NotConfigured`] when either credential is
    /// missing from both the settings and the environment.
    pub fn new(settings: &NutritionixSettings) -> Result<Self, ProviderError> {
        let app_id = credential(&settings.app_id, "NUTRITIONIX_APP_ID").ok_or_else(|| {
            ProviderError::NotConfigured("nutritionix app_id (NUTRITIONIX_APP_ID)".to_string())
        })?;
        let app_key = credential(&settings.app_key, "NUTRITIONIX_APP_KEY").ok_or_else(|| {
            ProviderError::NotConfigured("nutritionix app_key (NUTRITIONIX_APP_KEY)".to_string())
        })?;

        let timeout = Duration::from_millis(settings.timeout_ms);
        Ok(Self {
            client: http_client(timeout)?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            app_id,
            app_key,
            page_size: settings.page_size.max(1) as usize,
            timeout,
        })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("x-app-id", &self.app_id)
            .header("x-app-key", &self.app_key)
    }
}

/// Translate one entry. Nutritionix figures are per serving.
fn to_record(item: &Item) -> Option<FoodRecord> {
    let source_id = match (&item.nix_item_id, &item.tag_id) {
        (Some(id), _) if !id.trim().is_empty() => id.trim().to_string(),
        (_, Some(tag)) => format!("tag:{tag}"),
        _ => return None,
    };

    let macros = Macros::new(
        non_negative(item.nf_calories.or_else(|| item.attr(types::ATTR_ENERGY_KCAL))),
        non_negative(item.nf_protein.or_else(|| item.attr(types::ATTR_PROTEIN))),
        non_negative(
            item.nf_total_carbohydrate
                .or_else(|| item.attr(types::ATTR_CARBOHYDRATE)),
        ),
        non_negative(item.nf_total_fat.or_else(|| item.attr(types::ATTR_FAT))),
    );

    let (size, unit) = match item.serving_weight_grams.filter(|g| *g > 0.0) {
        Some(grams) => (grams, "g".to_string()),
        None => (
            item.serving_qty.unwrap_or(1.0),
            item.serving_unit
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .unwrap_or("serving")
                .to_string(),
        ),
    };

    let mut record = FoodRecord::new(FoodSource::Nutritionix, source_id, item.food_name.trim())
        .with_macros(macros)
        .with_serving(size, unit);
    if let Some(brand) = &item.brand_name {
        record = record.with_brand(brand.as_str());
    }
    if let Some(upc) = &item.upc {
        record = record.with_barcode(upc.as_str());
    }
    Some(record)
}

#[async_trait]
impl FoodProvider for NutritionixProvider {
    fn source(&self) -> FoodSource {
        FoodSource::Nutritionix
    }

    fn description(&self) -> &'static str {
        "Nutritionix common and branded foods"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn search(&self, query: &str) -> Result<Vec<FoodRecord>, ProviderError> {
        let url = format!("{}/v2/search/instant", self.base_url);
        let request = self
            .authed(self.client.get(&url))
            .query(&[("query", query), ("detailed", "true")]);

        let response: InstantResponse = fetch_json(request).await?.unwrap_or_default();
        debug!(
            target: "larder.provider.nutritionix",
            query,
            common = response.common.len(),
            branded = response.branded.len(),
            "search"
        );

        Ok(response
            .common
            .iter()
            .chain(response.branded.iter())
            .filter_map(to_record)
            .take(self.page_size)
            .collect())
    }

    async fn lookup(&self, barcode: &str) -> Result<Option<FoodRecord>, ProviderError> {
        let url = format!("{}/v2/search/item", self.base_url);
        let request = self
            .authed(self.client.get(&url))
            .query(&[("upc", barcode.trim())]);

        let response: Option<ItemResponse> = fetch_json(request).await?;
        Ok(response
            .and_then(|r| r.foods.into_iter().next())
            .and_then(|item| to_record(&item))
            .map(|record| match record.barcode {
                Some(_) => record,
                None => record.with_barcode(barcode),
            }))
    }
}
