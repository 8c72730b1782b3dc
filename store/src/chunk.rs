use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata associated with a stored passage
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ChunkMetadata {
    /// Title of the document the passage came from
    pub title: Option<String>,

    /// Page number within the source document (1-indexed)
    pub page: Option<u32>,

    /// Path or name of the source file
    pub source_file: Option<String>,

    /// Custom metadata fields
    #[serde(flatten)]
    pub custom: BTreeMap<String, serde_json::Value>,
}

/// A passage of indexed text with a stable identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Stable identifier, unique within a collection
    pub id: String,

    /// The passage text
    pub content: String,

    /// Additional metadata
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: ChunkMetadata::default(),
        }
    }

    /// Create a new chunk with metadata
    pub fn with_metadata(
        id: impl Into<String>,
        content: impl Into<String>,
        metadata: ChunkMetadata,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata,
        }
    }
}
