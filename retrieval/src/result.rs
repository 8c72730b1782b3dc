use quarry_store::ChunkMetadata;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifies which retrieval mechanism produced a candidate
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    /// Dense vector similarity
    Vector,
    /// Lexical/keyword matching
    Keyword,
    /// Graph relationship traversal
    Graph,
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceTag::Vector => write!(f, "vector"),
            SourceTag::Keyword => write!(f, "keyword"),
            SourceTag::Graph => write!(f, "graph"),
        }
    }
}

/// A candidate passage as returned by a single source.
///
/// `raw_score` is source-local: scales are not comparable across
/// sources, only the rank order within one source's list is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCandidate {
    pub chunk_id: String,
    pub source: SourceTag,
    pub raw_score: f32,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// A deduplicated candidate with its fused score and per-source
/// provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedResult {
    pub chunk_id: String,
    pub fused_score: f32,
    pub contributing_sources: BTreeSet<SourceTag>,
    /// 1-based rank this chunk held within each contributing source
    pub per_source_rank: BTreeMap<SourceTag, usize>,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// A final pipeline result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    pub chunk_id: String,
    pub fused_score: f32,
    pub contributing_sources: BTreeSet<SourceTag>,
    pub per_source_rank: BTreeMap<SourceTag, usize>,
    pub content: String,
    pub metadata: ChunkMetadata,

    /// 1-based, dense, no ties
    pub final_rank: usize,

    /// Present only when the reranker produced the ordering; purely
    /// observational
    pub rerank_score: Option<f32>,
}

impl RankedResult {
    /// Build a ranked result from a fused one
    pub fn from_fused(fused: FusedResult, final_rank: usize, rerank_score: Option<f32>) -> Self {
        Self {
            chunk_id: fused.chunk_id,
            fused_score: fused.fused_score,
            contributing_sources: fused.contributing_sources,
            per_source_rank: fused.per_source_rank,
            content: fused.content,
            metadata: fused.metadata,
            final_rank,
            rerank_score,
        }
    }
}

/// Non-fatal degradations encountered while answering a query. These
/// are part of the response, never silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchWarning {
    /// One source failed; its candidates are missing from the results
    SourceFailed { source: SourceTag, reason: String },

    /// The reranker failed or produced invalid output; results carry
    /// the fused order instead
    RerankDegraded { reason: String },
}

impl fmt::Display for SearchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchWarning::SourceFailed { source, reason } => {
                write!(f, "{source} source failed: {reason}")
            }
            SearchWarning::RerankDegraded { reason } => {
                write!(f, "reranking degraded: {reason}")
            }
        }
    }
}

/// Search performance statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchStats {
    /// Total time in milliseconds
    pub total_time_ms: u64,

    /// Query expansion time in milliseconds
    pub expand_time_ms: u64,

    /// Fan-out time (slowest surviving source) in milliseconds
    pub retrieval_time_ms: u64,

    /// Fusion time in milliseconds
    pub fusion_time_ms: u64,

    /// Reranking time in milliseconds
    pub rerank_time_ms: u64,

    /// Candidates returned per source
    pub source_counts: BTreeMap<SourceTag, usize>,
}

/// The pipeline's answer to one query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The question as sent to the sources (post expansion, if any)
    pub query: String,

    /// Ranked results, best first
    pub results: Vec<RankedResult>,

    /// Non-fatal degradations, empty on a clean run
    pub warnings: Vec<SearchWarning>,

    /// Timings and counts
    pub stats: SearchStats,
}

impl SearchResponse {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Get the top N results
    pub fn top(&self, n: usize) -> &[RankedResult] {
        &self.results[..n.min(self.results.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fused(chunk_id: &str) -> FusedResult {
        FusedResult {
            chunk_id: chunk_id.to_string(),
            fused_score: 0.05,
            contributing_sources: BTreeSet::from([SourceTag::Vector]),
            per_source_rank: BTreeMap::from([(SourceTag::Vector, 1)]),
            content: "text".to_string(),
            metadata: ChunkMetadata::default(),
        }
    }

    #[test]
    fn test_ranked_from_fused() {
        let ranked = RankedResult::from_fused(fused("c1"), 3, Some(1.0));
        assert_eq!(ranked.chunk_id, "c1");
        assert_eq!(ranked.final_rank, 3);
        assert_eq!(ranked.rerank_score, Some(1.0));
    }

    #[test]
    fn test_source_tag_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SourceTag::Vector).unwrap(),
            "\"vector\""
        );
    }

    #[test]
    fn test_per_source_rank_serializes_as_map() {
        let ranked = RankedResult::from_fused(fused("c1"), 1, None);
        let json = serde_json::to_value(&ranked).unwrap();
        assert_eq!(json["per_source_rank"]["vector"], 1);
    }

    #[test]
    fn test_warning_display() {
        let warning = SearchWarning::SourceFailed {
            source: SourceTag::Graph,
            reason: "timed out".to_string(),
        };
        assert_eq!(warning.to_string(), "graph source failed: timed out");
    }

    #[test]
    fn test_response_top_clamps() {
        let response = SearchResponse {
            query: "q".to_string(),
            results: vec![
                RankedResult::from_fused(fused("a"), 1, None),
                RankedResult::from_fused(fused("b"), 2, None),
            ],
            warnings: vec![],
            stats: SearchStats::default(),
        };
        assert_eq!(response.top(1).len(), 1);
        assert_eq!(response.top(9).len(), 2);
    }
}
