/*!
# Quarry Retrieval

Hybrid retrieval and ranking pipeline combining:
- **Vector search** via embedding similarity for conceptual matches
- **Keyword search** via lexical scoring for exact-term matches
- **Graph search** via entity-relationship traversal
- **Reciprocal Rank Fusion (RRF)** for scale-independent combination
- **LLM reranking** as an optional, strictly validated second pass

## Pipeline

```text
Question
  └─> Query expansion (optional, best-effort)
        ├─> Vector source  ─┐
        ├─> Keyword source ─┼─ concurrent fan-out, per-source timeout,
        └─> Graph source   ─┘  failure isolation
              └─> RRF fusion (dedupe + deterministic ordering)
                    └─> Reranking (optional, falls back to fused order)
                          └─> Ranked results + warnings + stats
```

Sources run concurrently and fail independently: a rate-limited or down
backend degrades answer quality instead of failing the query. Only two
conditions surface as errors — invalid input and every enabled source
failing.

## Example

```rust,no_run
use quarry_retrieval::{HybridRetrieval, RetrievalConfig, RetrievalSource, SearchOptions};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), quarry_retrieval::RetrievalError> {
    let sources: Vec<Arc<dyn RetrievalSource>> = vec![]; // built from store backends
    let engine = HybridRetrieval::new(RetrievalConfig::default(), sources)?;

    let response = engine
        .search("contracts", "how are invoices reconciled?", SearchOptions::default())
        .await?;

    for result in &response.results {
        println!("{}. {} ({:.4})", result.final_rank, result.chunk_id, result.fused_score);
    }
    Ok(())
}
```
*/

mod config;
mod coordinator;
mod error;
mod expand;
mod fusion;
mod llm;
mod query;
mod rerank;
mod result;
mod retrieval;
mod source;

pub use config::{RetrievalConfig, SearchOptions};
pub use coordinator::{RetrievalCoordinator, SourceOutcome};
pub use error::{Result, RetrievalError, SourceError};
pub use expand::{LlmQueryExpander, NoopExpander, QueryExpander};
pub use fusion::FusionEngine;
pub use llm::{CompletionClient, CompletionError};
pub use query::Query;
pub use rerank::LlmReranker;
pub use result::{
    FusedResult, RankedResult, SearchResponse, SearchStats, SearchWarning, SourceCandidate,
    SourceTag,
};
pub use retrieval::HybridRetrieval;
pub use source::{GraphSource, KeywordSource, RetrievalSource, VectorSource};
