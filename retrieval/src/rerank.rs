use crate::llm::CompletionClient;
use crate::result::{FusedResult, RankedResult, SearchWarning};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

/// Second-pass reranker backed by a completion endpoint.
///
/// The endpoint is asked for a permutation of candidate indices and its
/// reply is treated as adversarial input: malformed tokens are dropped,
/// duplicates keep their first occurrence, out-of-range indices are
/// ignored, and indices the reply never mentions are appended in fused
/// order. The output is therefore always a complete permutation of the
/// input, and any outright failure falls back to the fused order. The
/// result count never changes and nothing here errors to the caller.
pub struct LlmReranker {
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
    /// Per-candidate character cap on content quoted in the prompt
    snippet_chars: usize,
}

impl LlmReranker {
    pub fn new(client: Arc<dyn CompletionClient>, timeout: Duration, snippet_chars: usize) -> Self {
        Self {
            client,
            timeout,
            snippet_chars,
        }
    }

    /// Reorder `fused` by asking the endpoint for a relevance ordering.
    ///
    /// Returns the ranked results and, when reranking degraded to the
    /// fused order, the warning describing why.
    pub async fn rerank(
        &self,
        query_text: &str,
        fused: Vec<FusedResult>,
    ) -> (Vec<RankedResult>, Option<SearchWarning>) {
        if fused.is_empty() {
            return (Vec::new(), None);
        }

        let prompt = self.build_prompt(query_text, &fused);

        let reply = match tokio::time::timeout(self.timeout, self.client.complete(&prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(err)) => return Self::degrade(fused, err.to_string()),
            Err(_) => {
                return Self::degrade(
                    fused,
                    format!("timed out after {}ms", self.timeout.as_millis()),
                );
            }
        };

        let order = Self::parse_ordering(&reply, fused.len());
        if order.is_empty() {
            return Self::degrade(fused, "reply contained no valid indices".to_string());
        }

        debug!(
            "reranker reordered {} of {} candidates",
            order.len(),
            fused.len()
        );
        (Self::apply_ordering(fused, order), None)
    }

    fn build_prompt(&self, query_text: &str, fused: &[FusedResult]) -> String {
        let mut prompt = format!(
            "You are ranking passages by relevance to a question.\n\
             Question: {query_text}\n\nPassages:\n"
        );
        for (index, result) in fused.iter().enumerate() {
            let snippet: String = result.content.chars().take(self.snippet_chars).collect();
            prompt.push_str(&format!("[{}] {snippet}\n", index + 1));
        }
        prompt.push_str(
            "\nReply with the passage numbers ordered from most to least \
             relevant, comma-separated. Reply with numbers only.",
        );
        prompt
    }

    /// Extract a valid ordering from free text: digit runs parsed as
    /// 1-based indices, range-checked, first occurrence wins.
    fn parse_ordering(reply: &str, len: usize) -> Vec<usize> {
        let mut seen = vec![false; len];
        let mut order = Vec::new();

        for token in reply
            .split(|c: char| !c.is_ascii_digit())
            .filter(|t| !t.is_empty())
        {
            let Ok(number) = token.parse::<usize>() else {
                continue;
            };
            if (1..=len).contains(&number) && !seen[number - 1] {
                seen[number - 1] = true;
                order.push(number - 1);
            }
        }
        order
    }

    /// Reorder by the (possibly partial) index list, appending every
    /// unmentioned candidate in its fused position
    fn apply_ordering(fused: Vec<FusedResult>, mut order: Vec<usize>) -> Vec<RankedResult> {
        let total = fused.len();
        let mut mentioned = vec![false; total];
        for &index in &order {
            mentioned[index] = true;
        }
        order.extend((0..total).filter(|&i| !mentioned[i]));

        let mut slots: Vec<Option<FusedResult>> = fused.into_iter().map(Some).collect();
        order
            .into_iter()
            .enumerate()
            .filter_map(|(position, index)| {
                slots[index].take().map(|result| {
                    RankedResult::from_fused(
                        result,
                        position + 1,
                        Some((total - position) as f32),
                    )
                })
            })
            .collect()
    }

    fn degrade(
        fused: Vec<FusedResult>,
        reason: String,
    ) -> (Vec<RankedResult>, Option<SearchWarning>) {
        warn!("reranking degraded, keeping fused order: {reason}");
        let ranked = fused
            .into_iter()
            .enumerate()
            .map(|(index, result)| RankedResult::from_fused(result, index + 1, None))
            .collect();
        (ranked, Some(SearchWarning::RerankDegraded { reason }))
    }
}
