//! Configuration for providers, caching, similarity and the fitness bridge.
//!
//! Every field has a default, so an empty or missing file is a valid
//! configuration.

use crate::food::SourcePriority;
use crate::similarity::SimilarityConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Free-text search results drift; keep them briefly
pub const DEFAULT_SEARCH_TTL_SECS: u64 = 300;

/// Barcode data is effectively immutable
pub const DEFAULT_BARCODE_TTL_SECS: u64 = 86_400;

pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Default per-provider timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default results requested per provider
pub const DEFAULT_PAGE_SIZE: u32 = 25;

pub const USDA_BASE_URL: &str = "https://api.nal.usda.gov/fdc/v1";
pub const OPEN_FOOD_FACTS_BASE_URL: &str = "https://world.openfoodfacts.org";
pub const NUTRITIONIX_BASE_URL: &str = "https://trackapi.nutritionix.com";

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

// ============================================================================
// Cache
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_search_ttl")]
    pub search_ttl_secs: u64,

    #[serde(default = "default_barcode_ttl")]
    pub barcode_ttl_secs: u64,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_search_ttl() -> u64 {
    DEFAULT_SEARCH_TTL_SECS
}

fn default_barcode_ttl() -> u64 {
    DEFAULT_BARCODE_TTL_SECS
}

fn default_sweep_interval() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            search_ttl_secs: DEFAULT_SEARCH_TTL_SECS,
            barcode_ttl_secs: DEFAULT_BARCODE_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl CacheSettings {
    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_secs)
    }

    pub fn barcode_ttl(&self) -> Duration {
        Duration::from_secs(self.barcode_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

// ============================================================================
// Providers
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// YAML catalog of custom foods (default: ~/.config/larder/foods.yaml)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            catalog_path: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl LocalSettings {
    pub fn resolved_catalog_path(&self) -> PathBuf {
        self.catalog_path
            .clone()
            .unwrap_or_else(|| config_dir().join("foods.yaml"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsdaSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Falls back to `USDA_API_KEY`, then `DEMO_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_usda_url")]
    pub base_url: String,
}

fn default_usda_url() -> String {
    USDA_BASE_URL.to_string()
}

impl Default for UsdaSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            page_size: DEFAULT_PAGE_SIZE,
            base_url: default_usda_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenFoodFactsSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_off_url")]
    pub base_url: String,
}

fn default_off_url() -> String {
    OPEN_FOOD_FACTS_BASE_URL.to_string()
}

impl Default for OpenFoodFactsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            page_size: DEFAULT_PAGE_SIZE,
            base_url: default_off_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutritionixSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Falls back to `NUTRITIONIX_APP_ID`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    /// Falls back to `NUTRITIONIX_APP_KEY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_key: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_nutritionix_url")]
    pub base_url: String,
}

fn default_nutritionix_url() -> String {
    NUTRITIONIX_BASE_URL.to_string()
}

impl Default for NutritionixSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            app_id: None,
            app_key: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            page_size: DEFAULT_PAGE_SIZE,
            base_url: default_nutritionix_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub local: LocalSettings,

    #[serde(default)]
    pub usda: UsdaSettings,

    #[serde(default)]
    pub open_food_facts: OpenFoodFactsSettings,

    #[serde(default)]
    pub nutritionix: NutritionixSettings,
}

// ============================================================================
// Fitness bridge
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessSettings {
    /// Interpreter used to run the bridge script
    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<PathBuf>,

    #[serde(default = "default_fitness_timeout")]
    pub timeout_secs: u64,

    /// Minimum spacing between upstream calls for one user
    #[serde(default = "default_min_interval")]
    pub min_interval_secs: u64,

    /// How long a user is held off after the upstream reports rate limiting
    #[serde(default = "default_cooldown")]
    pub rate_limit_cooldown_secs: u64,
}

fn default_program() -> String {
    "python3".to_string()
}

fn default_fitness_timeout() -> u64 {
    60
}

fn default_min_interval() -> u64 {
    10
}

fn default_cooldown() -> u64 {
    900
}

impl Default for FitnessSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            script: None,
            timeout_secs: default_fitness_timeout(),
            min_interval_secs: default_min_interval(),
            rate_limit_cooldown_secs: default_cooldown(),
        }
    }
}

impl FitnessSettings {
    pub fn resolved_script(&self) -> PathBuf {
        self.script
            .clone()
            .unwrap_or_else(|| config_dir().join("fitness").join("fitness_service.py"))
    }
}

// ============================================================================
// LarderConfig
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LarderConfig {
    /// Source preference, highest first
    #[serde(default)]
    pub priority: SourcePriority,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub similarity: SimilarityConfig,

    #[serde(default)]
    pub providers: ProviderSettings,

    #[serde(default)]
    pub fitness: FitnessSettings,
}

/// `~/.config/larder` (or the platform equivalent).
pub fn config_dir() -> PathBuf {
    let base = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("larder")
}

// ============================================================================
// ConfigStore
// ============================================================================

/// File-backed configuration.
///
/// YAML by default; a path ending in `.toml` is read and written as TOML.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store at `~/.config/larder/config.yaml`.
    pub fn new_default() -> Self {
        Self {
            path: config_dir().join("config.yaml"),
        }
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_toml(&self) -> bool {
        self.path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false)
    }

    /// Load the configuration; a missing file yields defaults.
    pub fn load(&self) -> Result<LarderConfig, ConfigError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LarderConfig::default())
            }
            Err(e) => return Err(ConfigError::Io(e.to_string())),
        };

        if content.trim().is_empty() {
            return Ok(LarderConfig::default());
        }

        if self.is_toml() {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    pub fn save(&self, config: &LarderConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = if self.is_toml() {
            toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            serde_yaml::to_string(config).map_err(|e| ConfigError::Serialize(e.to_string()))?
        };

        std::fs::write(&self.path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new_default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialize(String),
}

// ============================================================================
// Tests
// ============================================================================
