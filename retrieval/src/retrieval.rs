use crate::config::{RetrievalConfig, SearchOptions};
use crate::coordinator::RetrievalCoordinator;
use crate::error::{Result, RetrievalError};
use crate::expand::{NoopExpander, QueryExpander};
use crate::fusion::FusionEngine;
use crate::llm::CompletionClient;
use crate::query::Query;
use crate::rerank::LlmReranker;
use crate::result::{
    FusedResult, RankedResult, SearchResponse, SearchStats, SearchWarning,
};
use crate::source::RetrievalSource;
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// The hybrid retrieval pipeline: expansion, concurrent fan-out,
/// fusion, optional reranking.
///
/// All collaborators are constructor-injected; there is no process-wide
/// state, and concurrent queries share nothing mutable. The semaphore
/// capping in-flight backend requests is shared across queries by
/// design.
pub struct HybridRetrieval {
    config: RetrievalConfig,
    expander: Arc<dyn QueryExpander>,
    coordinator: RetrievalCoordinator,
    fusion: FusionEngine,
    reranker: Option<LlmReranker>,
}

impl HybridRetrieval {
    /// Build a pipeline over the given sources. Expansion defaults to
    /// a pass-through and no reranker is configured; see
    /// [`with_expander`](Self::with_expander) and
    /// [`with_reranker`](Self::with_reranker).
    pub fn new(
        config: RetrievalConfig,
        sources: Vec<Arc<dyn RetrievalSource>>,
    ) -> Result<Self> {
        config.validate().map_err(RetrievalError::Validation)?;

        let permits = Arc::new(Semaphore::new(config.max_concurrent_requests));
        let coordinator =
            RetrievalCoordinator::new(sources, config.source_timeout(), permits);
        let fusion = FusionEngine::new(config.rrf_k);

        Ok(Self {
            config,
            expander: Arc::new(NoopExpander),
            coordinator,
            fusion,
            reranker: None,
        })
    }

    /// Use a query expander for `expand_query` requests
    pub fn with_expander(mut self, expander: Arc<dyn QueryExpander>) -> Self {
        self.expander = expander;
        self
    }

    /// Use a completion endpoint for `rerank` requests
    pub fn with_reranker(mut self, client: Arc<dyn CompletionClient>) -> Self {
        self.reranker = Some(LlmReranker::new(
            client,
            self.config.completion_timeout(),
            self.config.rerank_snippet_chars,
        ));
        self
    }

    /// Answer one question against a named collection.
    ///
    /// Errors only on invalid input, an unknown collection, or every
    /// enabled source failing; any other degradation is reported in
    /// [`SearchResponse::warnings`]. An empty result list is a
    /// successful outcome.
    pub async fn search(
        &self,
        collection: &str,
        question: &str,
        options: SearchOptions,
    ) -> Result<SearchResponse> {
        let start = Instant::now();
        let mut query = Query::new(
            collection,
            question,
            options,
            self.config.min_query_length,
        )?;
        debug!(
            "query {}: '{}' against collection '{}'",
            query.id, query.raw_text, query.collection
        );

        let mut stats = SearchStats::default();

        if query.options.expand_query {
            let expand_start = Instant::now();
            let expanded = self.expander.expand(&query.raw_text).await;
            stats.expand_time_ms = expand_start.elapsed().as_millis() as u64;
            if expanded != query.raw_text {
                debug!("query {} expanded to '{expanded}'", query.id);
                query.expanded_text = Some(expanded);
            }
        }

        let retrieval_start = Instant::now();
        let (per_source, mut warnings) = self
            .coordinator
            .run(&query.collection, query.effective_text(), &query.options)
            .await?;
        stats.retrieval_time_ms = retrieval_start.elapsed().as_millis() as u64;
        for (tag, candidates) in &per_source {
            stats.source_counts.insert(*tag, candidates.len());
        }

        let fusion_start = Instant::now();
        let fused = self.fusion.fuse(per_source, query.options.top_k);
        stats.fusion_time_ms = fusion_start.elapsed().as_millis() as u64;

        let results = if query.options.rerank && !fused.is_empty() {
            let rerank_start = Instant::now();
            let ranked = match &self.reranker {
                Some(reranker) => {
                    let (ranked, warning) =
                        reranker.rerank(&query.raw_text, fused).await;
                    if let Some(warning) = warning {
                        warnings.push(warning);
                    }
                    ranked
                }
                None => {
                    warnings.push(SearchWarning::RerankDegraded {
                        reason: "no completion client configured".to_string(),
                    });
                    rank_in_fused_order(fused)
                }
            };
            stats.rerank_time_ms = rerank_start.elapsed().as_millis() as u64;
            ranked
        } else {
            rank_in_fused_order(fused)
        };

        stats.total_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "query {} returned {} results with {} warnings in {}ms",
            query.id,
            results.len(),
            warnings.len(),
            stats.total_time_ms
        );

        Ok(SearchResponse {
            query: query.effective_text().to_string(),
            results,
            warnings,
            stats,
        })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }
}

/// Dense 1-based ranks in fused order, no rerank scores
fn rank_in_fused_order(fused: Vec<FusedResult>) -> Vec<RankedResult> {
    fused
        .into_iter()
        .enumerate()
        .map(|(index, result)| RankedResult::from_fused(result, index + 1, None))
        .collect()
}
