use crate::config::SearchOptions;
use crate::error::RetrievalError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single retrieval invocation. Created fresh per call, immutable
/// once built (expansion fills `expanded_text` before fan-out).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// Unique id for this invocation, used in logs
    pub id: Uuid,

    /// The question as the caller asked it
    pub raw_text: String,

    /// Broadened query text, if expansion ran
    pub expanded_text: Option<String>,

    /// Name of the collection to search
    pub collection: String,

    pub options: SearchOptions,
}

impl Query {
    /// Build and validate a query. All validation happens here, before
    /// any I/O.
    pub fn new(
        collection: &str,
        question: &str,
        options: SearchOptions,
        min_query_length: usize,
    ) -> Result<Self, RetrievalError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RetrievalError::Validation("question is empty".to_string()));
        }
        if question.chars().count() < min_query_length {
            return Err(RetrievalError::Validation(format!(
                "question must be at least {min_query_length} characters"
            )));
        }
        if collection.trim().is_empty() {
            return Err(RetrievalError::Validation(
                "collection name is empty".to_string(),
            ));
        }
        options.validate().map_err(RetrievalError::Validation)?;

        Ok(Self {
            id: Uuid::new_v4(),
            raw_text: question.to_string(),
            expanded_text: None,
            collection: collection.to_string(),
            options,
        })
    }

    /// The text to send to the sources: expanded if available,
    /// otherwise raw
    pub fn effective_text(&self) -> &str {
        self.expanded_text.as_deref().unwrap_or(&self.raw_text)
    }
}
