use crate::result::SourceTag;
use quarry_store::StoreError;
use thiserror::Error;

/// Caller-visible errors. Per-source failures and rerank failures are
/// recovered inside the pipeline and surface as warnings on the
/// response instead.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Malformed input, rejected before any I/O
    #[error("invalid request: {0}")]
    Validation(String),

    /// The referenced collection does not exist
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// Every enabled source failed
    #[error("all retrieval sources failed: {}", format_failures(.0))]
    TotalRetrievalFailure(Vec<(SourceTag, String)>),
}

fn format_failures(failures: &[(SourceTag, String)]) -> String {
    failures
        .iter()
        .map(|(tag, reason)| format!("{tag}: {reason}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single source's failure, passed through the coordinator as data
/// rather than thrown across the fan-out boundary
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for SourceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CollectionNotFound(name) => SourceError::CollectionNotFound(name),
            other => SourceError::Unavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
