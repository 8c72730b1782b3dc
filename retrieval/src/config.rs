use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-query options: how many results to return and which pipeline
/// stages to run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchOptions {
    /// Maximum number of results to return
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Broaden the query before retrieval
    #[serde(default)]
    pub expand_query: bool,

    /// Enable the vector similarity source
    #[serde(default = "default_true")]
    pub use_vector: bool,

    /// Enable the keyword source
    #[serde(default = "default_true")]
    pub use_keyword: bool,

    /// Enable the graph traversal source
    #[serde(default = "default_true")]
    pub use_graph: bool,

    /// Run the second-pass reranker over the fused results
    #[serde(default)]
    pub rerank: bool,
}

fn default_top_k() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            expand_query: false,
            use_vector: true,
            use_keyword: true,
            use_graph: true,
            rerank: false,
        }
    }
}

impl SearchOptions {
    /// Validate the options
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.top_k == 0 {
            return Err("top_k must be >= 1".to_string());
        }
        if !self.use_vector && !self.use_keyword && !self.use_graph {
            return Err("at least one retrieval source must be enabled".to_string());
        }
        Ok(())
    }
}

/// Configuration for the retrieval pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// RRF smoothing constant k (higher = less emphasis on top ranks)
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,

    /// Per-source search timeout in milliseconds
    #[serde(default = "default_source_timeout_ms")]
    pub source_timeout_ms: u64,

    /// Timeout for expansion and reranking completion calls, in
    /// milliseconds
    #[serde(default = "default_completion_timeout_ms")]
    pub completion_timeout_ms: u64,

    /// Maximum in-flight backend requests across all queries
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Maximum characters of candidate content included per item in the
    /// reranking prompt
    #[serde(default = "default_rerank_snippet_chars")]
    pub rerank_snippet_chars: usize,

    /// Minimum question length in characters
    #[serde(default = "default_min_query_length")]
    pub min_query_length: usize,
}

fn default_rrf_k() -> f32 {
    60.0
}

fn default_source_timeout_ms() -> u64 {
    5_000
}

fn default_completion_timeout_ms() -> u64 {
    10_000
}

fn default_max_concurrent_requests() -> usize {
    8
}

fn default_rerank_snippet_chars() -> usize {
    600
}

fn default_min_query_length() -> usize {
    2
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_k: default_rrf_k(),
            source_timeout_ms: default_source_timeout_ms(),
            completion_timeout_ms: default_completion_timeout_ms(),
            max_concurrent_requests: default_max_concurrent_requests(),
            rerank_snippet_chars: default_rerank_snippet_chars(),
            min_query_length: default_min_query_length(),
        }
    }
}

impl RetrievalConfig {
    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.rrf_k <= 0.0 {
            return Err(format!("rrf_k must be > 0, got {}", self.rrf_k));
        }
        if self.source_timeout_ms == 0 {
            return Err("source_timeout_ms must be > 0".to_string());
        }
        if self.completion_timeout_ms == 0 {
            return Err("completion_timeout_ms must be > 0".to_string());
        }
        if self.max_concurrent_requests == 0 {
            return Err("max_concurrent_requests must be >= 1".to_string());
        }
        if self.rerank_snippet_chars == 0 {
            return Err("rerank_snippet_chars must be > 0".to_string());
        }
        Ok(())
    }

    /// Per-source timeout as a [`Duration`]
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    /// Completion-call timeout as a [`Duration`]
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }

    /// Config tuned for latency: short timeouts, tight prompts
    pub fn fast() -> Self {
        Self {
            source_timeout_ms: 1_500,
            completion_timeout_ms: 3_000,
            rerank_snippet_chars: 300,
            ..Default::default()
        }
    }

    /// Config tuned for recall against slow backends
    pub fn thorough() -> Self {
        Self {
            source_timeout_ms: 15_000,
            completion_timeout_ms: 30_000,
            ..Default::default()
        }
    }
}
