use crate::config::SearchOptions;
use crate::error::{RetrievalError, SourceError};
use crate::result::{SearchWarning, SourceCandidate, SourceTag};
use crate::source::RetrievalSource;
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Outcome of one source's search, carried across the fan-out boundary
/// as data. Errors are never thrown between tasks.
#[derive(Debug)]
pub enum SourceOutcome {
    Success(Vec<SourceCandidate>),
    Failure(SourceError),
}

/// Runs the enabled sources concurrently and assembles whatever
/// succeeds within budget.
///
/// This is the pipeline's failure-isolation boundary: each source gets
/// its own task and timeout, and one source's failure never aborts its
/// siblings. Dropping the future returned by [`run`](Self::run) aborts
/// all in-flight source calls.
pub struct RetrievalCoordinator {
    sources: Vec<Arc<dyn RetrievalSource>>,
    timeout: Duration,
    /// Shared cap on in-flight backend requests, across queries
    permits: Arc<Semaphore>,
}

impl RetrievalCoordinator {
    pub fn new(
        sources: Vec<Arc<dyn RetrievalSource>>,
        timeout: Duration,
        permits: Arc<Semaphore>,
    ) -> Self {
        Self {
            sources,
            timeout,
            permits,
        }
    }

    fn enabled(tag: SourceTag, options: &SearchOptions) -> bool {
        match tag {
            SourceTag::Vector => options.use_vector,
            SourceTag::Keyword => options.use_keyword,
            SourceTag::Graph => options.use_graph,
        }
    }

    /// Fan out to every enabled source and collect per-source results.
    ///
    /// Returns the surviving candidate lists keyed by source, plus one
    /// warning per failed source. Fails only when validation fails,
    /// the collection is missing, or every enabled source failed.
    pub async fn run(
        &self,
        collection: &str,
        query_text: &str,
        options: &SearchOptions,
    ) -> Result<(BTreeMap<SourceTag, Vec<SourceCandidate>>, Vec<SearchWarning>), RetrievalError>
    {
        let active: Vec<Arc<dyn RetrievalSource>> = self
            .sources
            .iter()
            .filter(|s| Self::enabled(s.tag(), options))
            .cloned()
            .collect();

        if active.is_empty() {
            return Err(RetrievalError::Validation(
                "no retrieval source enabled".to_string(),
            ));
        }

        let mut tasks: JoinSet<(SourceTag, SourceOutcome)> = JoinSet::new();
        let mut pending: BTreeSet<SourceTag> = BTreeSet::new();

        for source in active {
            let tag = source.tag();
            pending.insert(tag);

            let collection = collection.to_string();
            let query_text = query_text.to_string();
            let top_k = options.top_k;
            let timeout = self.timeout;
            let permits = self.permits.clone();

            tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            tag,
                            SourceOutcome::Failure(SourceError::Unavailable(
                                "request limiter closed".to_string(),
                            )),
                        );
                    }
                };

                let outcome =
                    match tokio::time::timeout(timeout, source.search(&collection, &query_text, top_k))
                        .await
                    {
                        Ok(Ok(candidates)) => SourceOutcome::Success(candidates),
                        Ok(Err(err)) => SourceOutcome::Failure(err),
                        Err(_) => SourceOutcome::Failure(SourceError::Unavailable(format!(
                            "timed out after {}ms",
                            timeout.as_millis()
                        ))),
                    };
                (tag, outcome)
            });
        }

        let mut survivors: BTreeMap<SourceTag, Vec<SourceCandidate>> = BTreeMap::new();
        let mut failures: Vec<(SourceTag, String)> = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            // A panicked source task is indistinguishable from a lost
            // one; the leftover tags in `pending` are recorded below.
            let Ok((tag, outcome)) = joined else { continue };
            pending.remove(&tag);

            match outcome {
                SourceOutcome::Success(candidates) => {
                    debug!("{tag} source returned {} candidates", candidates.len());
                    survivors.insert(tag, candidates);
                }
                SourceOutcome::Failure(SourceError::CollectionNotFound(name)) => {
                    // Every sibling reads the same catalog, so this
                    // cannot be a partial condition. Abort the query;
                    // dropping the JoinSet cancels in-flight siblings.
                    return Err(RetrievalError::CollectionNotFound(name));
                }
                SourceOutcome::Failure(err) => {
                    warn!("{tag} source failed: {err}");
                    failures.push((tag, err.to_string()));
                }
            }
        }

        for tag in pending {
            warn!("{tag} source task aborted");
            failures.push((tag, "source task aborted".to_string()));
        }

        if survivors.is_empty() {
            return Err(RetrievalError::TotalRetrievalFailure(failures));
        }

        let warnings = failures
            .into_iter()
            .map(|(source, reason)| SearchWarning::SourceFailed { source, reason })
            .collect();

        Ok((survivors, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use quarry_store::ChunkMetadata;

    struct StubSource {
        tag: SourceTag,
        outcome: Result<Vec<SourceCandidate>, SourceError>,
        delay: Duration,
    }

    impl StubSource {
        fn ok(tag: SourceTag, ids: &[&str]) -> Arc<dyn RetrievalSource> {
            let candidates = ids
                .iter()
                .enumerate()
                .map(|(i, id)| SourceCandidate {
                    chunk_id: id.to_string(),
                    source: tag,
                    raw_score: 1.0 - i as f32 * 0.1,
                    content: format!("content of {id}"),
                    metadata: ChunkMetadata::default(),
                })
                .collect();
            Arc::new(Self {
                tag,
                outcome: Ok(candidates),
                delay: Duration::ZERO,
            })
        }

        fn failing(tag: SourceTag, err: SourceError) -> Arc<dyn RetrievalSource> {
            Arc::new(Self {
                tag,
                outcome: Err(err),
                delay: Duration::ZERO,
            })
        }

        fn slow(tag: SourceTag, delay: Duration) -> Arc<dyn RetrievalSource> {
            Arc::new(Self {
                tag,
                outcome: Ok(vec![]),
                delay,
            })
        }
    }

    #[async_trait]
    impl RetrievalSource for StubSource {
        fn tag(&self) -> SourceTag {
            self.tag
        }

        async fn search(
            &self,
            _collection: &str,
            _query_text: &str,
            _top_k: usize,
        ) -> Result<Vec<SourceCandidate>, SourceError> {
            if self.delay > Duration::ZERO {
                tokio::time::sleep(self.delay).await;
            }
            self.outcome.clone()
        }
    }

    fn coordinator(sources: Vec<Arc<dyn RetrievalSource>>) -> RetrievalCoordinator {
        RetrievalCoordinator::new(sources, Duration::from_millis(200), Arc::new(Semaphore::new(8)))
    }

    #[tokio::test]
    async fn test_all_sources_succeed() {
        let coordinator = coordinator(vec![
            StubSource::ok(SourceTag::Vector, &["a", "b"]),
            StubSource::ok(SourceTag::Keyword, &["b", "c"]),
        ]);

        let options = SearchOptions {
            use_graph: false,
            ..Default::default()
        };
        let (survivors, warnings) = coordinator.run("docs", "query", &options).await.unwrap();

        assert_eq!(survivors.len(), 2);
        assert_eq!(survivors[&SourceTag::Vector].len(), 2);
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn test_one_failure_is_isolated() {
        let coordinator = coordinator(vec![
            StubSource::ok(SourceTag::Vector, &["a"]),
            StubSource::failing(
                SourceTag::Keyword,
                SourceError::Unavailable("rate limited".to_string()),
            ),
        ]);

        let options = SearchOptions {
            use_graph: false,
            ..Default::default()
        };
        let (survivors, warnings) = coordinator.run("docs", "query", &options).await.unwrap();

        assert_eq!(survivors.len(), 1);
        assert!(survivors.contains_key(&SourceTag::Vector));
        assert_eq!(
            warnings,
            vec![SearchWarning::SourceFailed {
                source: SourceTag::Keyword,
                reason: "source unavailable: rate limited".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_all_failures_is_an_error() {
        let coordinator = coordinator(vec![
            StubSource::failing(
                SourceTag::Vector,
                SourceError::Unavailable("down".to_string()),
            ),
            StubSource::failing(
                SourceTag::Keyword,
                SourceError::Unavailable("down".to_string()),
            ),
        ]);

        let options = SearchOptions {
            use_graph: false,
            ..Default::default()
        };
        let err = coordinator.run("docs", "query", &options).await.unwrap_err();
        match err {
            RetrievalError::TotalRetrievalFailure(failures) => assert_eq!(failures.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_slow_source_times_out_without_stalling_siblings() {
        let coordinator = RetrievalCoordinator::new(
            vec![
                StubSource::ok(SourceTag::Vector, &["a"]),
                StubSource::slow(SourceTag::Keyword, Duration::from_secs(30)),
            ],
            Duration::from_millis(50),
            Arc::new(Semaphore::new(8)),
        );

        let options = SearchOptions {
            use_graph: false,
            ..Default::default()
        };
        let (survivors, warnings) = coordinator.run("docs", "query", &options).await.unwrap();

        assert!(survivors.contains_key(&SourceTag::Vector));
        assert_eq!(warnings.len(), 1);
        match &warnings[0] {
            SearchWarning::SourceFailed { source, reason } => {
                assert_eq!(*source, SourceTag::Keyword);
                assert!(reason.contains("timed out"));
            }
            other => panic!("unexpected warning: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_collection_is_fatal() {
        let coordinator = coordinator(vec![
            StubSource::ok(SourceTag::Vector, &["a"]),
            StubSource::failing(
                SourceTag::Keyword,
                SourceError::CollectionNotFound("docs".to_string()),
            ),
        ]);

        let options = SearchOptions {
            use_graph: false,
            ..Default::default()
        };
        let err = coordinator.run("docs", "query", &options).await.unwrap_err();
        assert!(matches!(err, RetrievalError::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn test_disabled_sources_are_not_run() {
        let coordinator = coordinator(vec![
            StubSource::ok(SourceTag::Vector, &["a"]),
            StubSource::failing(
                SourceTag::Keyword,
                SourceError::Unavailable("must not run".to_string()),
            ),
        ]);

        let options = SearchOptions {
            use_keyword: false,
            use_graph: false,
            ..Default::default()
        };
        let (survivors, warnings) = coordinator.run("docs", "query", &options).await.unwrap();

        assert_eq!(survivors.len(), 1);
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn test_no_enabled_source_is_a_validation_error() {
        let coordinator = coordinator(vec![StubSource::ok(SourceTag::Vector, &["a"])]);

        let options = SearchOptions {
            use_vector: false,
            use_keyword: false,
            use_graph: false,
            ..Default::default()
        };
        let err = coordinator.run("docs", "query", &options).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Validation(_)));
    }
}
