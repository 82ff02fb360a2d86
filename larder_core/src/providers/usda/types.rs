use serde::Deserialize;

pub const ENERGY_KCAL: u32 = 1008;
/// Atwater general / specific energy, reported when 1008 is absent.
pub const ENERGY_ATWATER_GENERAL: u32 = 2047;
pub const ENERGY_ATWATER_SPECIFIC: u32 = 2048;
pub const ENERGY_KJ: u32 = 1062;
pub const PROTEIN: u32 = 1003;
pub const FAT: u32 = 1004;
pub const CARBOHYDRATE: u32 = 1005;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub total_hits: u64,
    #[serde(default)]
    pub foods: Vec<SearchFood>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFood {
    pub fdc_id: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub brand_owner: Option<String>,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub gtin_upc: Option<String>,
    #[serde(default)]
    pub serving_size: Option<f64>,
    #[serde(default)]
    pub serving_size_unit: Option<String>,
    #[serde(default)]
    pub food_nutrients: Vec<SearchNutrient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchNutrient {
    pub nutrient_id: u32,
    #[serde(default)]
    pub value: Option<f64>,
}

impl SearchFood {
    pub fn nutrient(&self, id: u32) -> Option<f64> {
        self.food_nutrients
            .iter()
            .find(|n| n.nutrient_id == id)
            .and_then(|n| n.value)
            .filter(|v| v.is_finite())
    }

    pub fn is_branded(&self) -> bool {
        self.data_type
            .as_deref()
            .map(|t| t.eq_ignore_ascii_case("branded"))
            .unwrap_or(false)
    }
}
