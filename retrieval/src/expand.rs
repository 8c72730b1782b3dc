use crate::llm::CompletionClient;
use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on appended expansion text; anything longer is a
/// runaway completion, not a term list
const MAX_EXPANSION_CHARS: usize = 256;

/// Broadens a query before retrieval. Expansion is best-effort: an
/// implementation must return the original text when it cannot improve
/// on it, and must never fail.
#[async_trait]
pub trait QueryExpander: Send + Sync {
    /// Return a query that is a textual superset of `raw`, safe to
    /// substitute for it at every source
    async fn expand(&self, raw: &str) -> String;
}

/// Pass-through expander
pub struct NoopExpander;

#[async_trait]
impl QueryExpander for NoopExpander {
    async fn expand(&self, raw: &str) -> String {
        raw.to_string()
    }
}

/// Expands queries by asking a completion endpoint for related terms
/// and appending them to the original text, so the result always
/// contains the raw query verbatim.
pub struct LlmQueryExpander {
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
}

impl LlmQueryExpander {
    pub fn new(client: Arc<dyn CompletionClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn build_prompt(raw: &str) -> String {
        format!(
            "List up to 8 short search terms closely related to the query below. \
             Respond with the terms only, separated by spaces.\n\nQuery: {raw}"
        )
    }

    /// Collapse whitespace and separators into single spaces and cap
    /// the length
    fn sanitize(text: &str) -> String {
        let collapsed = text
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        collapsed.chars().take(MAX_EXPANSION_CHARS).collect()
    }
}

#[async_trait]
impl QueryExpander for LlmQueryExpander {
    async fn expand(&self, raw: &str) -> String {
        let prompt = Self::build_prompt(raw);

        let completion =
            match tokio::time::timeout(self.timeout, self.client.complete(&prompt)).await {
                Ok(Ok(text)) => text,
                Ok(Err(err)) => {
                    warn!("query expansion failed, using raw query: {err}");
                    return raw.to_string();
                }
                Err(_) => {
                    warn!(
                        "query expansion timed out after {}ms, using raw query",
                        self.timeout.as_millis()
                    );
                    return raw.to_string();
                }
            };

        let terms = Self::sanitize(&completion);
        if terms.is_empty() {
            debug!("query expansion returned nothing usable, using raw query");
            return raw.to_string();
        }

        debug!("expanded query with terms: '{terms}'");
        format!("{raw} {terms}")
    }
}
