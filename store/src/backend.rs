use crate::chunk::Chunk;
use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Similarity measure used by a vector backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimilarityMetric {
    /// Cosine similarity, higher is more similar
    Cosine,
    /// Inner product, higher is more similar
    InnerProduct,
    /// Euclidean distance, lower is more similar
    Euclidean,
}

impl SimilarityMetric {
    /// Whether the metric is a distance (lower is better) rather than
    /// a similarity (higher is better)
    pub fn is_distance(self) -> bool {
        matches!(self, SimilarityMetric::Euclidean)
    }
}

/// A chunk with a backend-local score. The score's scale and direction
/// depend on the backend; callers normalize before comparing across
/// backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// A chunk reached through relationship traversal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphHit {
    pub chunk: Chunk,
    /// Number of relationship edges connecting this chunk to the
    /// requested entities
    pub relation_count: usize,
}

/// Generates query embeddings
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, StoreError>;

    /// Dimension of the embeddings this client produces
    fn dimension(&self) -> usize;
}

/// Vector similarity search over stored chunk embeddings
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Return up to `limit` chunks most similar to `embedding`,
    /// best first according to [`VectorBackend::metric`]
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError>;

    /// The similarity measure scores are expressed in
    fn metric(&self) -> SimilarityMetric;
}

/// Lexical search over stored chunk text
#[async_trait]
pub trait KeywordBackend: Send + Sync {
    /// Return up to `limit` chunks matching `query`, best first,
    /// higher score is better
    async fn search(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError>;
}

/// Relationship traversal from entities to the chunks that mention them
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Return up to `limit` chunks connected to any of `entities`,
    /// most connected first
    async fn traverse(
        &self,
        collection: &str,
        entities: &[String],
        limit: usize,
    ) -> Result<Vec<GraphHit>, StoreError>;
}
