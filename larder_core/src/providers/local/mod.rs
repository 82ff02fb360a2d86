//! User-curated custom foods kept in a YAML catalog.

use crate::config::LocalSettings;
use crate::error::ProviderError;
use crate::food::{FoodRecord, FoodSource, Macros};
use crate::similarity::normalize_name;
use crate::utils::canonical_barcode;
use crate::FoodProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// One entry in the catalog file. Figures are per the stated serving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalFood {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub fat_g: f64,
    #[serde(default = "default_serving_size")]
    pub serving_size: f64,
    #[serde(default = "default_serving_unit")]
    pub serving_unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

fn default_serving_size() -> f64 {
    100.0
}

fn default_serving_unit() -> String {
    "g".to_string()
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    foods: Vec<LocalFood>,
}

impl LocalFood {
    fn to_record(&self) -> FoodRecord {
        let mut record = FoodRecord::new(FoodSource::Local, self.id.trim(), self.name.trim())
            .with_macros(Macros::new(
                self.calories,
                self.protein_g,
                self.carbs_g,
                self.fat_g,
            ))
            .with_serving(self.serving_size, self.serving_unit.trim());
        if let Some(brand) = &self.brand {
            record = record.with_brand(brand.as_str());
        }
        if let Some(barcode) = &self.barcode {
            record = record.with_barcode(barcode.as_str());
        }
        record
    }

    fn matches(&self, tokens: &[String]) -> bool {
        let haystack = match &self.brand {
            Some(brand) => normalize_name(&format!("{} {}", self.name, brand)),
            None => normalize_name(&self.name),
        };
        tokens.iter().all(|t| haystack.contains(t.as_str()))
    }
}

pub struct LocalProvider {
    foods: Vec<LocalFood>,
    page_size: usize,
}

impl LocalProvider {
    pub fn new(foods: Vec<LocalFood>, page_size: usize) -> Self {
        Self {
            foods,
            page_size: page_size.max(1),
        }
    }

    pub fn from_settings(settings: &LocalSettings) -> Result<Self, ProviderError> {
        let path = settings.resolved_catalog_path();
        let foods = load_catalog(&path)?;
        Ok(Self::new(foods, settings.page_size as usize))
    }

    pub fn len(&self) -> usize {
        self.foods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }
}

/// Read a catalog file. A missing file is an empty catalog.
pub fn load_catalog(path: &Path) -> Result<Vec<LocalFood>, ProviderError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(target: "larder.provider.local", path = %path.display(), "no catalog file");
            return Ok(Vec::new());
        }
        Err(e) => return Err(ProviderError::Io(e)),
    };

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let file: CatalogFile = serde_yaml::from_str(&content)
        .map_err(|e| ProviderError::Catalog(format!("{}: {}", path.display(), e)))?;
    debug!(target: "larder.provider.local", path = %path.display(), foods = file.foods.len(), "loaded catalog");
    Ok(file.foods)
}

#[async_trait]
impl FoodProvider for LocalProvider {
    fn source(&self) -> FoodSource {
        FoodSource::Local
    }

    fn description(&self) -> &'static str {
        "Custom foods from the local catalog"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn search(&self, query: &str) -> Result<Vec<FoodRecord>, ProviderError> {
        let tokens: Vec<String> = normalize_name(query)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .foods
            .iter()
            .filter(|food| food.matches(&tokens))
            .take(self.page_size)
            .map(LocalFood::to_record)
            .collect())
    }

    async fn lookup(&self, barcode: &str) -> Result<Option<FoodRecord>, ProviderError> {
        let wanted = canonical_barcode(barcode);
        Ok(self
            .foods
            .iter()
            .find(|food| {
                food.barcode
                    .as_deref()
                    .map(|code| canonical_barcode(code) == wanted)
                    .unwrap_or(false)
            })
            .map(LocalFood::to_record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
foods:
  - id: oats-1
    name: Rolled Oats
    brand: Grandma's Mill
    calories: 150
    protein_g: 5
    carbs_g: 27
    fat_g: 3
    serving_size: 40
    barcode: "0012345678905"
  - id: shake-1
    name: Protein Shake
    calories: 120
    protein_g: 24
    carbs_g: 3
    fat_g: 1.5
    serving_size: 330
    serving_unit: ml
  - id: oat-milk
    name: Oat Milk
    calories: 46
    carbs_g: 6.7
    fat_g: 1.5
    serving_unit: ml
"#;

    fn provider() -> LocalProvider {
        let file: CatalogFile = serde_yaml::from_str(CATALOG).unwrap();
        LocalProvider::new(file.foods, 10)
    }

    #[tokio::test]
    async fn test_search_matches_all_tokens() {
        let provider = provider();
        let results = provider.search("oats").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_id, "oats-1");
        assert_eq!(results[0].serving_size, 40.0);
        assert_eq!(results[0].brand.as_deref(), Some("Grandma's Mill"));

        let results = provider.search("OAT").await.unwrap();
        assert_eq!(results.len(), 2);

        let results = provider.search("oat milk").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].serving_unit, "ml");
        assert_eq!(results[0].serving_size, 100.0);
    }

    #[tokio::test]
    async fn test_search_by_brand() {
        let provider = provider();
        let results = provider.search("grandmas").await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_page_size_caps_results() {
        let file: CatalogFile = serde_yaml::from_str(CATALOG).unwrap();
        let provider = LocalProvider::new(file.foods, 1);
        assert_eq!(provider.search("oat").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_ignores_leading_zeros() {
        let provider = provider();
        let hit = provider.lookup("012345678905").await.unwrap().unwrap();
        assert_eq!(hit.source_id, "oats-1");
        assert!(provider.lookup("99999999").await.unwrap().is_none());
    }

    #[test]
    fn test_missing_catalog_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let foods = load_catalog(&dir.path().join("foods.yaml")).unwrap();
        assert!(foods.is_empty());
    }

    #[test]
    fn test_bad_catalog_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foods.yaml");
        std::fs::write(&path, "foods: {oops: true}").unwrap();
        assert!(matches!(
            load_catalog(&path),
            Err(ProviderError::Catalog(_))
        ));
    }

    #[test]
    fn test_from_settings_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foods.yaml");
        std::fs::write(&path, CATALOG).unwrap();
        let settings = LocalSettings {
            catalog_path: Some(path),
            ..LocalSettings::default()
        };
        let provider = LocalProvider::from_settings(&settings).unwrap();
        assert_eq!(provider.len(), 3);
    }
}
