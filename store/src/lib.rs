//! # Quarry Store
//!
//! Passage storage contracts for the quarry retrieval pipeline.
//!
//! This crate defines the value types (`Chunk`, `ChunkMetadata`) and the
//! narrow backend interfaces the pipeline retrieves through:
//!
//! - [`VectorBackend`] — similarity search over stored chunk embeddings
//! - [`KeywordBackend`] — lexical search over chunk text
//! - [`GraphBackend`] — entity-relationship traversal
//! - [`EmbeddingClient`] — query embedding generation
//!
//! It also ships [`MemoryStore`], an in-memory implementation of all
//! three backends, used as a test double and as the demo backend.
//!
//! ## Example
//!
//! ```no_run
//! use quarry_store::{Chunk, MemoryStore, VectorBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), quarry_store::StoreError> {
//!     let mut store = MemoryStore::new();
//!     store.create_collection("docs");
//!     store.add_chunk(
//!         "docs",
//!         Chunk::new("c1", "the payment service retries on timeout"),
//!         vec![0.1, 0.7, 0.2],
//!     )?;
//!
//!     let hits = store.search("docs", &[0.1, 0.7, 0.2], 5).await?;
//!     println!("found {} chunks", hits.len());
//!     Ok(())
//! }
//! ```

mod backend;
mod chunk;
mod error;
mod memory;

pub use backend::{
    EmbeddingClient, GraphBackend, GraphHit, KeywordBackend, ScoredChunk, SimilarityMetric,
    VectorBackend,
};
pub use chunk::{Chunk, ChunkMetadata};
pub use error::StoreError;
pub use memory::{HashingEmbedder, MemoryStore};
