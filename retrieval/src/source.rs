use crate::error::SourceError;
use crate::result::{SourceCandidate, SourceTag};
use async_trait::async_trait;
use log::debug;
use quarry_store::{
    EmbeddingClient, GraphBackend, KeywordBackend, ScoredChunk, VectorBackend,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A single retrieval mechanism. Implementations return at most
/// `top_k` candidates, best first, with `raw_score` where higher is
/// more relevant within that source. A broken backend must surface
/// [`SourceError::Unavailable`], never an empty list.
#[async_trait]
pub trait RetrievalSource: Send + Sync {
    fn tag(&self) -> SourceTag;

    async fn search(
        &self,
        collection: &str,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<SourceCandidate>, SourceError>;
}

fn candidates_from_scored(
    tag: SourceTag,
    hits: Vec<ScoredChunk>,
    top_k: usize,
) -> Vec<SourceCandidate> {
    let mut candidates: Vec<SourceCandidate> = hits
        .into_iter()
        .map(|hit| SourceCandidate {
            chunk_id: hit.chunk.id,
            source: tag,
            raw_score: hit.score,
            content: hit.chunk.content,
            metadata: hit.chunk.metadata,
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.raw_score
            .total_cmp(&a.raw_score)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    candidates.truncate(top_k);
    candidates
}

/// Dense retrieval: embeds the query and searches stored chunk vectors
pub struct VectorSource {
    embedder: Arc<dyn EmbeddingClient>,
    backend: Arc<dyn VectorBackend>,
}

impl VectorSource {
    pub fn new(embedder: Arc<dyn EmbeddingClient>, backend: Arc<dyn VectorBackend>) -> Self {
        Self { embedder, backend }
    }
}

#[async_trait]
impl RetrievalSource for VectorSource {
    fn tag(&self) -> SourceTag {
        SourceTag::Vector
    }

    async fn search(
        &self,
        collection: &str,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<SourceCandidate>, SourceError> {
        let embedding = self.embedder.embed(query_text).await.map_err(SourceError::from)?;
        let mut hits = self
            .backend
            .search(collection, &embedding, top_k)
            .await
            .map_err(SourceError::from)?;

        // Distance metrics rank lower-is-better; negate so raw_score is
        // uniformly higher-is-better
        if self.backend.metric().is_distance() {
            for hit in &mut hits {
                hit.score = -hit.score;
            }
        }

        let candidates = candidates_from_scored(SourceTag::Vector, hits, top_k);
        debug!("vector source returned {} candidates", candidates.len());
        Ok(candidates)
    }
}

/// Lexical retrieval over chunk text
pub struct KeywordSource {
    backend: Arc<dyn KeywordBackend>,
}

impl KeywordSource {
    pub fn new(backend: Arc<dyn KeywordBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl RetrievalSource for KeywordSource {
    fn tag(&self) -> SourceTag {
        SourceTag::Keyword
    }

    async fn search(
        &self,
        collection: &str,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<SourceCandidate>, SourceError> {
        let hits = self
            .backend
            .search(collection, query_text, top_k)
            .await
            .map_err(SourceError::from)?;

        let candidates = candidates_from_scored(SourceTag::Keyword, hits, top_k);
        debug!("keyword source returned {} candidates", candidates.len());
        Ok(candidates)
    }
}

/// Graph retrieval: extracts entity terms from the query and traverses
/// relationship edges to the chunks mentioning them
pub struct GraphSource {
    backend: Arc<dyn GraphBackend>,
}

impl GraphSource {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self { backend }
    }

    /// Candidate entity terms: lowercased alphanumeric tokens of three
    /// or more characters, first occurrence kept
    fn entity_terms(query_text: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        query_text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= 3)
            .map(|t| t.to_lowercase())
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }
}

#[async_trait]
impl RetrievalSource for GraphSource {
    fn tag(&self) -> SourceTag {
        SourceTag::Graph
    }

    async fn search(
        &self,
        collection: &str,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<SourceCandidate>, SourceError> {
        let entities = Self::entity_terms(query_text);
        if entities.is_empty() {
            debug!("graph source found no entity terms in query");
            return Ok(Vec::new());
        }

        let hits = self
            .backend
            .traverse(collection, &entities, top_k)
            .await
            .map_err(SourceError::from)?;

        let scored = hits
            .into_iter()
            .map(|hit| ScoredChunk {
                chunk: hit.chunk,
                score: hit.relation_count as f32,
            })
            .collect();

        let candidates = candidates_from_scored(SourceTag::Graph, scored, top_k);
        debug!("graph source returned {} candidates", candidates.len());
        Ok(candidates)
    }
}
