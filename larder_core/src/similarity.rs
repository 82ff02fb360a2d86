//! Name and nutrition similarity used to spot the same food reported by
//! different providers.
//!
//! Everything here is pure; thresholds live in [`SimilarityConfig`] so they
//! can be tuned from configuration.

use crate::food::FoodRecord;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NAME_THRESHOLD: f64 = 0.8;
pub const DEFAULT_CONTAINMENT_SCORE: f64 = 0.9;
pub const DEFAULT_NUTRITION_TOLERANCE: f64 = 0.10;

/// Tunable thresholds for duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Minimum name similarity for two records to be considered the same food
    #[serde(default = "default_name_threshold")]
    pub name_threshold: f64,

    /// Base score when one normalized name contains the other
    #[serde(default = "default_containment_score")]
    pub containment_score: f64,

    /// Relative tolerance per macro, on a per-100-unit basis
    #[serde(default = "default_nutrition_tolerance")]
    pub nutrition_tolerance: f64,
}

fn default_name_threshold() -> f64 {
    DEFAULT_NAME_THRESHOLD
}

fn default_containment_score() -> f64 {
    DEFAULT_CONTAINMENT_SCORE
}

fn default_nutrition_tolerance() -> f64 {
    DEFAULT_NUTRITION_TOLERANCE
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            name_threshold: DEFAULT_NAME_THRESHOLD,
            containment_score: DEFAULT_CONTAINMENT_SCORE,
            nutrition_tolerance: DEFAULT_NUTRITION_TOLERANCE,
        }
    }
}

/// Lowercase, drop punctuation, collapse runs of whitespace.
pub fn normalize_name(name: &str) -> String {
    let stripped: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similarity of two food names in `[0, 1]`.
pub fn name_similarity(a: &str, b: &str, config: &SimilarityConfig) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let len_a = a.chars().count();
    let len_b = b.chars().count();

    if a.contains(&b) || b.contains(&a) {
        // A branding prefix/suffix should not defeat the match; closer
        // lengths grade the score towards 1.0.
        let ratio = len_a.min(len_b) as f64 / len_a.max(len_b) as f64;
        let base = config.containment_score.clamp(0.0, 1.0);
        return (base + (1.0 - base) * ratio).min(1.0);
    }

    let distance = levenshtein(&a, &b);
    let longest = len_a.max(len_b) as f64;
    (1.0 - distance as f64 / longest).clamp(0.0, 1.0)
}

/// Character-level edit distance.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Whether two records carry the same nutrition once both are expressed per
/// 100 units of serving size.
pub fn nutrition_similar(x: &FoodRecord, y: &FoodRecord, config: &SimilarityConfig) -> bool {
    let (Some(x), Some(y)) = (x.per_100(), y.per_100()) else {
        return false;
    };

    x.as_array()
        .into_iter()
        .zip(y.as_array())
        .all(|(a, b)| macro_matches(a, b, config.nutrition_tolerance))
}

fn macro_matches(a: f64, b: f64, tolerance: f64) -> bool {
    if a == 0.0 && b == 0.0 {
        return true;
    }
    if a == 0.0 || b == 0.0 {
        return false;
    }
    let mean = (a + b) / 2.0;
    (a - b).abs() / mean <= tolerance
}

/// Ephemeral verdict from comparing two records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityJudgment {
    pub name_score: f64,
    pub nutrition_match: bool,
}

impl SimilarityJudgment {
    pub fn between(x: &FoodRecord, y: &FoodRecord, config: &SimilarityConfig) -> Self {
        Self {
            name_score: name_similarity(&x.name, &y.name, config),
            nutrition_match: nutrition_similar(x, y, config),
        }
    }

    pub fn is_duplicate(&self, config: &SimilarityConfig) -> bool {
        self.name_score >= config.name_threshold && self.nutrition_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::food::{FoodSource, Macros};

    fn record(name: &str, macros: Macros, serving: f64) -> FoodRecord {
        FoodRecord::new(FoodSource::Local, name, name)
            .with_macros(macros)
            .with_serving(serving, "g")
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Cola,   12oz CAN! "), "cola 12oz can");
        assert_eq!(normalize_name("Crème-Brûlée"), "crèmebrûlée");
        assert_eq!(normalize_name("..."), "");
    }

    #[test]
    fn test_exact_after_normalization() {
        let config = SimilarityConfig::default();
        assert_eq!(name_similarity("Apple", " apple. ", &config), 1.0);
    }

    #[test]
    fn test_containment_scores_near_point_nine() {
        let config = SimilarityConfig::default();
        let score = name_similarity("Cola", "Cola, 12oz can", &config);
        assert!(score >= 0.9 && score < 1.0, "score was {}", score);
    }

    #[test]
    fn test_levenshtein_fallback() {
        let config = SimilarityConfig::default();
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        let score = name_similarity("kitten", "sitting", &config);
        assert!((score - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
        assert!(name_similarity("banana", "steak", &config) < 0.5);
    }

    #[test]
    fn test_empty_inputs_score_zero() {
        let config = SimilarityConfig::default();
        assert_eq!(name_similarity("", "apple", &config), 0.0);
        assert_eq!(name_similarity("!!", "apple", &config), 0.0);
        assert_eq!(name_similarity("", "", &config), 0.0);
    }

    #[test]
    fn test_nutrition_similar_across_serving_sizes() {
        let config = SimilarityConfig::default();
        let per_100 = record("a", Macros::new(52.0, 0.3, 14.0, 0.2), 100.0);
        // same food, 182 g serving
        let per_apple = record("b", Macros::new(52.0 * 1.82, 0.3 * 1.82, 14.0 * 1.82, 0.2 * 1.82), 182.0);
        assert!(nutrition_similar(&per_100, &per_apple, &config));
    }

    #[test]
    fn test_nutrition_tolerance_edges() {
        let config = SimilarityConfig::default();
        let base = record("a", Macros::new(100.0, 10.0, 10.0, 10.0), 100.0);
        let close = record("b", Macros::new(109.0, 10.0, 10.0, 10.0), 100.0);
        let far = record("c", Macros::new(125.0, 10.0, 10.0, 10.0), 100.0);
        assert!(nutrition_similar(&base, &close, &config));
        assert!(!nutrition_similar(&base, &far, &config));
    }

    #[test]
    fn test_zero_macros() {
        let config = SimilarityConfig::default();
        let water = record("a", Macros::new(0.0, 0.0, 0.0, 0.0), 250.0);
        let water2 = record("b", Macros::new(0.0, 0.0, 0.0, 0.0), 100.0);
        let drink = record("c", Macros::new(0.0, 0.0, 0.1, 0.0), 100.0);
        assert!(nutrition_similar(&water, &water2, &config));
        assert!(!nutrition_similar(&water, &drink, &config));
    }

    #[test]
    fn test_judgment_thresholds_are_configurable() {
        let a = record("Greek Yogurt", Macros::new(59.0, 10.0, 3.6, 0.4), 100.0);
        let b = record("Greek Yoghurt", Macros::new(60.0, 10.2, 3.6, 0.4), 100.0);

        let strict = SimilarityConfig {
            name_threshold: 0.99,
            ..SimilarityConfig::default()
        };
        let judgment = SimilarityJudgment::between(&a, &b, &strict);
        assert!(judgment.nutrition_match);
        assert!(!judgment.is_duplicate(&strict));
        assert!(judgment.is_duplicate(&SimilarityConfig::default()));
    }
}
