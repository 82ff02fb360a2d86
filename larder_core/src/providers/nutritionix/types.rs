use crate::utils::deserialize_lenient_f64;
use serde::Deserialize;

/// `full_nutrients` attribute ids.
pub const ATTR_ENERGY_KCAL: u32 = 208;
pub const ATTR_PROTEIN: u32 = 203;
pub const ATTR_FAT: u32 = 204;
pub const ATTR_CARBOHYDRATE: u32 = 205;

#[derive(Debug, Default, Deserialize)]
pub struct InstantResponse {
    #[serde(default)]
    pub common: Vec<Item>,
    #[serde(default)]
    pub branded: Vec<Item>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemResponse {
    #[serde(default)]
    pub foods: Vec<Item>,
}

/// Common and branded entries share one shape; common foods carry a
/// `tag_id`, branded ones a `nix_item_id`.
#[derive(Debug, Default, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub food_name: String,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub nix_item_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tag_id")]
    pub tag_id: Option<String>,
    #[serde(default)]
    pub upc: Option<String>,

    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub serving_qty: Option<f64>,
    #[serde(default)]
    pub serving_unit: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub serving_weight_grams: Option<f64>,

    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub nf_calories: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub nf_protein: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub nf_total_carbohydrate: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub nf_total_fat: Option<f64>,

    #[serde(default)]
    pub full_nutrients: Vec<FullNutrient>,
}

#[derive(Debug, Deserialize)]
pub struct FullNutrient {
    pub attr_id: u32,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub value: Option<f64>,
}

impl Item {
    pub fn attr(&self, id: u32) -> Option<f64> {
        self.full_nutrients
            .iter()
            .find(|n| n.attr_id == id)
            .and_then(|n| n.value)
    }
}

/// `tag_id` arrives as a string in instant search and a number elsewhere.
fn deserialize_tag_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
