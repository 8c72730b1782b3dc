use crate::backend::{
    EmbeddingClient, GraphBackend, GraphHit, KeywordBackend, ScoredChunk, SimilarityMetric,
    VectorBackend,
};
use crate::chunk::Chunk;
use crate::error::StoreError;
use async_trait::async_trait;
use log::debug;
use nucleo_matcher::{Config, Matcher, Utf32Str};
use std::collections::{BTreeSet, HashMap};
use std::hash::{DefaultHasher, Hash, Hasher};

/// Lexical matches scoring below this (normalized) value are dropped
const MIN_LEXICAL_SCORE: f32 = 0.05;

struct StoredChunk {
    chunk: Chunk,
    embedding: Vec<f32>,
    entities: BTreeSet<String>,
}

#[derive(Default)]
struct Collection {
    chunks: Vec<StoredChunk>,
    /// Entity co-occurrence edges, stored in both directions
    relations: HashMap<String, BTreeSet<String>>,
}

/// In-memory store implementing all three retrieval backends.
///
/// Holds per-collection chunks with embeddings and entity links, plus
/// entity-to-entity relationship edges. Intended as a test double and
/// as the demo backend; a production deployment would put a real
/// vector/keyword/graph store behind the same traits.
#[derive(Default)]
pub struct MemoryStore {
    collections: HashMap<String, Collection>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection; a no-op if it already exists
    pub fn create_collection(&mut self, name: impl Into<String>) {
        self.collections.entry(name.into()).or_default();
    }

    /// Add a chunk with its embedding
    pub fn add_chunk(
        &mut self,
        collection: &str,
        chunk: Chunk,
        embedding: Vec<f32>,
    ) -> Result<(), StoreError> {
        self.add_chunk_with_entities(collection, chunk, embedding, &[])
    }

    /// Add a chunk with its embedding and the entities it mentions
    pub fn add_chunk_with_entities(
        &mut self,
        collection: &str,
        chunk: Chunk,
        embedding: Vec<f32>,
        entities: &[&str],
    ) -> Result<(), StoreError> {
        let coll = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        coll.chunks.push(StoredChunk {
            chunk,
            embedding,
            entities: entities.iter().map(|e| e.to_lowercase()).collect(),
        });
        Ok(())
    }

    /// Record a relationship edge between two entities
    pub fn relate(&mut self, collection: &str, a: &str, b: &str) -> Result<(), StoreError> {
        let coll = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        let (a, b) = (a.to_lowercase(), b.to_lowercase());
        coll.relations.entry(a.clone()).or_default().insert(b.clone());
        coll.relations.entry(b).or_default().insert(a);
        Ok(())
    }

    /// Number of chunks in a collection
    pub fn chunk_count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|c| c.chunks.len())
            .unwrap_or(0)
    }

    fn collection(&self, name: &str) -> Result<&Collection, StoreError> {
        self.collections
            .get(name)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorBackend for MemoryStore {
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let coll = self.collection(collection)?;

        let mut hits: Vec<ScoredChunk> = coll
            .chunks
            .iter()
            .map(|stored| ScoredChunk {
                chunk: stored.chunk.clone(),
                score: cosine_similarity(embedding, &stored.embedding),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        hits.truncate(limit);

        debug!("vector search in '{collection}' found {} hits", hits.len());
        Ok(hits)
    }

    fn metric(&self) -> SimilarityMetric {
        SimilarityMetric::Cosine
    }
}

#[async_trait]
impl KeywordBackend for MemoryStore {
    async fn search(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let coll = self.collection(collection)?;

        let mut matcher = Matcher::new(Config::DEFAULT);
        let mut query_buf: Vec<char> = Vec::new();
        let mut scored: Vec<(u16, &StoredChunk)> = Vec::new();

        for stored in &coll.chunks {
            let mut haystack_buf: Vec<char> = Vec::new();
            let haystack = Utf32Str::new(&stored.chunk.content, &mut haystack_buf);
            let needle = Utf32Str::new(query, &mut query_buf);

            if let Some(score) = matcher.fuzzy_match(haystack, needle) {
                // nucleo scores are ~0-1000
                if score as f32 / 1000.0 >= MIN_LEXICAL_SCORE {
                    scored.push((score, stored));
                }
            }
        }

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.chunk.id.cmp(&b.1.chunk.id)));
        scored.truncate(limit);

        debug!(
            "keyword search in '{collection}' found {} hits",
            scored.len()
        );

        Ok(scored
            .into_iter()
            .map(|(score, stored)| ScoredChunk {
                chunk: stored.chunk.clone(),
                score: (score as f32 / 1000.0).min(1.0),
            })
            .collect())
    }
}

#[async_trait]
impl GraphBackend for MemoryStore {
    async fn traverse(
        &self,
        collection: &str,
        entities: &[String],
        limit: usize,
    ) -> Result<Vec<GraphHit>, StoreError> {
        let coll = self.collection(collection)?;

        // One hop: the requested entities plus everything related to them
        let mut reachable: BTreeSet<String> =
            entities.iter().map(|e| e.to_lowercase()).collect();
        for entity in entities {
            if let Some(neighbors) = coll.relations.get(&entity.to_lowercase()) {
                reachable.extend(neighbors.iter().cloned());
            }
        }

        let mut hits: Vec<GraphHit> = coll
            .chunks
            .iter()
            .filter_map(|stored| {
                let relation_count = stored.entities.intersection(&reachable).count();
                (relation_count > 0).then(|| GraphHit {
                    chunk: stored.chunk.clone(),
                    relation_count,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.relation_count
                .cmp(&a.relation_count)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        hits.truncate(limit);

        debug!("graph traversal in '{collection}' found {} hits", hits.len());
        Ok(hits)
    }
}

/// Deterministic bag-of-words embedder: tokens are hashed into a
/// fixed-dimension histogram, L2-normalized. No external model, so it
/// is suitable for tests and demos only.
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

#[async_trait]
impl EmbeddingClient for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        if self.dim == 0 {
            return Err(StoreError::Embedding("dimension must be > 0".to_string()));
        }

        let mut vector = vec![0.0f32; self.dim];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() % self.dim as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store_with_chunks() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.create_collection("docs");
        store
            .add_chunk(
                "docs",
                Chunk::new("alpha", "invoice processing pipeline"),
                vec![1.0, 0.0, 0.0],
            )
            .unwrap();
        store
            .add_chunk(
                "docs",
                Chunk::new("beta", "payment retries and timeouts"),
                vec![0.0, 1.0, 0.0],
            )
            .unwrap();
        store
            .add_chunk(
                "docs",
                Chunk::new("gamma", "unrelated release notes"),
                vec![0.0, 0.0, 1.0],
            )
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_vector_search_orders_by_similarity() {
        let store = store_with_chunks();
        let hits = VectorBackend::search(&store, "docs", &[0.0, 1.0, 0.1], 10)
            .await
            .unwrap();

        assert_eq!(hits[0].chunk.id, "beta");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_vector_search_respects_limit() {
        let store = store_with_chunks();
        let hits = VectorBackend::search(&store, "docs", &[1.0, 1.0, 1.0], 2)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let store = MemoryStore::new();
        let err = VectorBackend::search(&store, "nope", &[1.0], 5)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn test_keyword_search_finds_lexical_match() {
        let store = store_with_chunks();
        let hits = KeywordBackend::search(&store, "docs", "payment retries", 10)
            .await
            .unwrap();

        assert!(!hits.is_empty());
        assert_eq!(hits[0].chunk.id, "beta");
    }

    #[tokio::test]
    async fn test_keyword_search_no_match_is_empty_not_error() {
        let store = store_with_chunks();
        let hits = KeywordBackend::search(&store, "docs", "zzzqqqxxx", 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_graph_traversal_counts_relations() {
        let mut store = MemoryStore::new();
        store.create_collection("docs");
        store
            .add_chunk_with_entities(
                "docs",
                Chunk::new("a", "acme acquired globex"),
                vec![1.0],
                &["acme", "globex"],
            )
            .unwrap();
        store
            .add_chunk_with_entities(
                "docs",
                Chunk::new("b", "globex quarterly earnings"),
                vec![1.0],
                &["globex"],
            )
            .unwrap();

        let hits = store
            .traverse("docs", &["acme".to_string(), "globex".to_string()], 10)
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.id, "a");
        assert_eq!(hits[0].relation_count, 2);
        assert_eq!(hits[1].relation_count, 1);
    }

    #[tokio::test]
    async fn test_graph_traversal_follows_edges() {
        let mut store = MemoryStore::new();
        store.create_collection("docs");
        store
            .add_chunk_with_entities(
                "docs",
                Chunk::new("a", "initech restructuring"),
                vec![1.0],
                &["initech"],
            )
            .unwrap();
        store.relate("docs", "acme", "initech").unwrap();

        // "initech" is reachable from "acme" through the relation edge
        let hits = store
            .traverse("docs", &["acme".to_string()], 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.id, "a");
    }

    #[tokio::test]
    async fn test_hashing_embedder_is_deterministic() {
        let embedder = HashingEmbedder::new(32);
        let a = embedder.embed("payment retries").await.unwrap();
        let b = embedder.embed("payment retries").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_hashing_embedder_distinguishes_texts() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed("payment retries").await.unwrap();
        let b = embedder.embed("release notes archive").await.unwrap();
        assert_ne!(a, b);
    }
}
