use crate::result::{FusedResult, SourceCandidate, SourceTag};
use log::debug;
use std::collections::BTreeMap;

/// Combines per-source candidate lists into one deduplicated ranking
/// using Reciprocal Rank Fusion:
///
/// ```text
/// fused_score(chunk) = Σ over sources containing it  1 / (k + rank)
/// ```
///
/// Rank-based fusion needs no score normalization: cosine similarity,
/// lexical scores and graph connectivity counts are never compared
/// directly, only each source's internal order matters.
pub struct FusionEngine {
    rrf_k: f32,
}

impl FusionEngine {
    /// `rrf_k` is the smoothing constant (typically 60); higher values
    /// damp the advantage of top ranks
    pub fn new(rrf_k: f32) -> Self {
        Self { rrf_k }
    }

    /// Fuse the per-source lists and truncate to `top_k`.
    ///
    /// Each input list must already be in descending relevance order,
    /// as the sources return them. The output order is total and
    /// reproducible: fused score descending, then number of
    /// contributing sources descending, then chunk id ascending.
    pub fn fuse(
        &self,
        per_source: BTreeMap<SourceTag, Vec<SourceCandidate>>,
        top_k: usize,
    ) -> Vec<FusedResult> {
        // Keyed by chunk id; BTreeMap so iteration (and therefore any
        // equal-sort-key case) is deterministic
        let mut merged: BTreeMap<String, FusedResult> = BTreeMap::new();

        for (tag, candidates) in per_source {
            for (index, candidate) in candidates.into_iter().enumerate() {
                let rank = index + 1;
                let entry = merged
                    .entry(candidate.chunk_id.clone())
                    .or_insert_with(|| FusedResult {
                        chunk_id: candidate.chunk_id,
                        fused_score: 0.0,
                        contributing_sources: Default::default(),
                        per_source_rank: Default::default(),
                        content: candidate.content,
                        metadata: candidate.metadata,
                    });

                // A duplicate within one source's list keeps its best
                // (first seen) rank
                if entry.per_source_rank.contains_key(&tag) {
                    continue;
                }

                entry.fused_score += 1.0 / (self.rrf_k + rank as f32);
                entry.contributing_sources.insert(tag);
                entry.per_source_rank.insert(tag, rank);
            }
        }

        let mut fused: Vec<FusedResult> = merged.into_values().collect();
        fused.sort_by(|a, b| {
            b.fused_score
                .total_cmp(&a.fused_score)
                .then_with(|| {
                    b.contributing_sources
                        .len()
                        .cmp(&a.contributing_sources.len())
                })
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        fused.truncate(top_k);

        debug!("fusion produced {} results", fused.len());
        fused
    }
}
