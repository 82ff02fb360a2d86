//! Canonical food records shared by every provider.

use crate::error::InvalidRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a food record came from.
///
/// Declaration order doubles as the final tie-break when two sources have the
/// same configured priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodSource {
    /// User-curated custom foods
    Local,
    /// USDA FoodData Central
    Usda,
    /// Nutritionix
    Nutritionix,
    /// Open Food Facts
    OpenFoodFacts,
}

impl FoodSource {
    pub const ALL: [FoodSource; 4] = [
        FoodSource::Local,
        FoodSource::Usda,
        FoodSource::Nutritionix,
        FoodSource::OpenFoodFacts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FoodSource::Local => "local",
            FoodSource::Usda => "usda",
            FoodSource::Nutritionix => "nutritionix",
            FoodSource::OpenFoodFacts => "open_food_facts",
        }
    }
}

impl fmt::Display for FoodSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FoodSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "local" | "custom" => Ok(FoodSource::Local),
            "usda" | "fdc" => Ok(FoodSource::Usda),
            "nutritionix" => Ok(FoodSource::Nutritionix),
            "open_food_facts" | "openfoodfacts" | "off" => Ok(FoodSource::OpenFoodFacts),
            other => Err(format!("unknown food source '{}'", other)),
        }
    }
}

/// The four tracked macronutrient figures, for some serving.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Macros {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl Macros {
    pub fn new(calories: f64, protein_g: f64, carbs_g: f64, fat_g: f64) -> Self {
        Self {
            calories,
            protein_g,
            carbs_g,
            fat_g,
        }
    }

    /// Multiply every figure by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            calories: self.calories * factor,
            protein_g: self.protein_g * factor,
            carbs_g: self.carbs_g * factor,
            fat_g: self.fat_g * factor,
        }
    }

    /// Figures in a fixed order: calories, protein, carbs, fat.
    pub fn as_array(&self) -> [f64; 4] {
        [self.calories, self.protein_g, self.carbs_g, self.fat_g]
    }
}

/// A normalized, provider-agnostic food item.
///
/// Nutrient figures are expressed per `serving_size` of `serving_unit`.
/// Records are built once by an adapter and then only read; anything that
/// needs different figures builds a new record (see [`FoodRecord::rescaled`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRecord {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,

    pub serving_size: f64,
    pub serving_unit: String,

    pub source: FoodSource,

    /// Provider-native identifier, stable for the same item across calls.
    pub source_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

impl FoodRecord {
    /// Start a record with zeroed macros and a 100 g serving.
    pub fn new(source: FoodSource, source_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            brand: None,
            calories: 0.0,
            protein_g: 0.0,
            carbs_g: 0.0,
            fat_g: 0.0,
            serving_size: 100.0,
            serving_unit: "g".to_string(),
            source,
            source_id: source_id.into(),
            barcode: None,
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        let brand = brand.into();
        let trimmed = brand.trim();
        self.brand = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    pub fn with_macros(mut self, macros: Macros) -> Self {
        self.calories = macros.calories;
        self.protein_g = macros.protein_g;
        self.carbs_g = macros.carbs_g;
        self.fat_g = macros.fat_g;
        self
    }

    pub fn with_serving(mut self, size: f64, unit: impl Into<String>) -> Self {
        self.serving_size = size;
        self.serving_unit = unit.into();
        self
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        let barcode = barcode.into();
        self.barcode = if barcode.trim().is_empty() {
            None
        } else {
            Some(barcode.trim().to_string())
        };
        self
    }

    pub fn macros(&self) -> Macros {
        Macros::new(self.calories, self.protein_g, self.carbs_g, self.fat_g)
    }

    /// Macros normalized to 100 units of the serving unit.
    ///
    /// Returns `None` when the serving size cannot be used as a divisor.
    pub fn per_100(&self) -> Option<Macros> {
        if !(self.serving_size.is_finite() && self.serving_size > 0.0) {
            return None;
        }
        Some(self.macros().scaled(100.0 / self.serving_size))
    }

    /// A copy of this record re-expressed per `serving_size` units.
    pub fn rescaled(&self, serving_size: f64) -> Option<FoodRecord> {
        if !(serving_size.is_finite() && serving_size > 0.0) {
            return None;
        }
        let per_100 = self.per_100()?;
        Some(
            self.clone()
                .with_macros(per_100.scaled(serving_size / 100.0))
                .with_serving(serving_size, self.serving_unit.clone()),
        )
    }

    /// The `(source, source_id)` identity used for exact-duplicate detection.
    pub fn key(&self) -> (FoodSource, &str) {
        (self.source, self.source_id.as_str())
    }

    /// Check the invariants every record handed to callers must satisfy.
    pub fn validate(&self) -> Result<(), InvalidRecord> {
        if self.name.trim().is_empty() {
            return Err(InvalidRecord::EmptyName);
        }
        if self.source_id.trim().is_empty() {
            return Err(InvalidRecord::EmptySourceId);
        }
        let names = ["calories", "protein_g", "carbs_g", "fat_g"];
        for (field, value) in names.into_iter().zip(self.macros().as_array()) {
            if !value.is_finite() || value < 0.0 {
                return Err(InvalidRecord::BadMacro { field, value });
            }
        }
        if !(self.serving_size.is_finite() && self.serving_size > 0.0) {
            return Err(InvalidRecord::BadServing(self.serving_size));
        }
        Ok(())
    }
}

/// Total order over sources used to break ties during deduplication and to
/// order barcode lookups.
///
/// The list is highest priority first. Sources not listed rank below every
/// listed one, ordered among themselves by declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourcePriority(Vec<FoodSource>);

impl SourcePriority {
    pub fn new(order: Vec<FoodSource>) -> Self {
        let mut deduped = Vec::with_capacity(order.len());
        for source in order {
            if !deduped.contains(&source) {
                deduped.push(source);
            }
        }
        Self(deduped)
    }

    /// Numeric rank; higher wins.
    pub fn rank(&self, source: FoodSource) -> usize {
        let listed = self.0.len();
        match self.0.iter().position(|s| *s == source) {
            Some(idx) => FoodSource::ALL.len() + (listed - idx),
            // Unlisted sources: keep a deterministic order below listed ones.
            None => FoodSource::ALL.len() - (source as usize),
        }
    }

    /// Compare two sources; `Ordering::Less` means `a` is preferred.
    pub fn compare(&self, a: FoodSource, b: FoodSource) -> std::cmp::Ordering {
        self.rank(b).cmp(&self.rank(a))
    }

    /// Every source, highest priority first.
    pub fn ordered(&self) -> Vec<FoodSource> {
        let mut all = FoodSource::ALL.to_vec();
        all.sort_by(|a, b| self.compare(*a, *b));
        all
    }

    pub fn as_slice(&self) -> &[FoodSource] {
        &self.0
    }
}

impl Default for SourcePriority {
    fn default() -> Self {
        Self(vec![
            FoodSource::Local,
            FoodSource::Usda,
            FoodSource::Nutritionix,
            FoodSource::OpenFoodFacts,
        ])
    }
}
