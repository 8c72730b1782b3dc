use async_trait::async_trait;
use thiserror::Error;

/// A text-completion call failed
#[derive(Debug, Clone, Error)]
#[error("completion failed: {0}")]
pub struct CompletionError(pub String);

/// Minimal contract for a text-generation endpoint, used by query
/// expansion and reranking. Implementations own the connection and its
/// rate limiting; the pipeline wraps every call in a timeout.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}
