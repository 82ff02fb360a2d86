use crate::food::{FoodRecord, FoodSource, SourcePriority};
use crate::similarity::{SimilarityConfig, SimilarityJudgment};
use std::collections::HashSet;
use tracing::debug;

/// Collapses records that describe the same food.
///
/// Input is stable-sorted by source priority, so when two records match the
/// one from the higher-priority source is kept, whatever order they arrived in.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    priority: SourcePriority,
    similarity: SimilarityConfig,
}

impl Deduplicator {
    pub fn new(priority: SourcePriority, similarity: SimilarityConfig) -> Self {
        Self {
            priority,
            similarity,
        }
    }

    pub fn priority(&self) -> &SourcePriority {
        &self.priority
    }

    pub fn similarity(&self) -> &SimilarityConfig {
        &self.similarity
    }

    pub fn dedupe(&self, mut records: Vec<FoodRecord>) -> Vec<FoodRecord> {
        records.sort_by(|a, b| self.priority.compare(a.source, b.source));

        let mut seen: HashSet<(FoodSource, String)> = HashSet::with_capacity(records.len());
        let mut kept: Vec<FoodRecord> = Vec::with_capacity(records.len());

        for candidate in records {
            if !seen.insert((candidate.source, candidate.source_id.clone())) {
                continue;
            }

            let duplicate_of = kept.iter().find(|existing| {
                SimilarityJudgment::between(existing, &candidate, &self.similarity)
                    .is_duplicate(&self.similarity)
            });

            if let Some(existing) = duplicate_of {
                debug!(
                    target: "larder.dedup",
                    kept = %format!("{}:{}", existing.source, existing.source_id),
                    skipped = %format!("{}:{}", candidate.source, candidate.source_id),
                    "duplicate food"
                );
                continue;
            }
            kept.push(candidate);
        }

        kept
    }
}
