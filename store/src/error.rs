use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The referenced collection does not exist
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// The backend is temporarily unable to serve the request.
    /// Distinct from an empty result: "no matches" is `Ok(vec![])`.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Failed to generate an embedding
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Any other backend failure
    #[error("backend error: {0}")]
    Backend(String),
}
