use crate::utils::deserialize_lenient_f64;
use serde::Deserialize;

/// Fields requested from the search endpoint.
pub const SEARCH_FIELDS: &str = "code,product_name,product_name_en,generic_name,brands,quantity,nutriments";

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub count: Option<f64>,
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
pub struct ProductResponse {
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub product: Option<Product>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_name_en: Option<String>,
    #[serde(default)]
    pub generic_name: Option<String>,
    #[serde(default)]
    pub brands: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub nutriments: Nutriments,
}

/// Per-100 g (or ml) nutriment values. OFF sends these as numbers or strings
/// depending on who entered the product.
#[derive(Debug, Default, Deserialize)]
pub struct Nutriments {
    #[serde(rename = "energy-kcal_100g", default, deserialize_with = "deserialize_lenient_f64")]
    pub energy_kcal_100g: Option<f64>,
    #[serde(rename = "energy_100g", default, deserialize_with = "deserialize_lenient_f64")]
    pub energy_kj_100g: Option<f64>,
    #[serde(rename = "proteins_100g", default, deserialize_with = "deserialize_lenient_f64")]
    pub proteins_100g: Option<f64>,
    #[serde(rename = "carbohydrates_100g", default, deserialize_with = "deserialize_lenient_f64")]
    pub carbohydrates_100g: Option<f64>,
    #[serde(rename = "fat_100g", default, deserialize_with = "deserialize_lenient_f64")]
    pub fat_100g: Option<f64>,
}

impl Product {
    pub fn display_name(&self) -> Option<&str> {
        [&self.product_name, &self.product_name_en, &self.generic_name]
            .into_iter()
            .filter_map(|n| n.as_deref())
            .map(str::trim)
            .find(|n| !n.is_empty())
    }

    /// First entry of the comma-separated `brands` list.
    pub fn primary_brand(&self) -> Option<&str> {
        self.brands
            .as_deref()
            .and_then(|b| b.split(',').next())
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }
}
