//! Concurrent batch coordination over many URLs.
//!
//! Bounded concurrency via a counting semaphore, per-slot inter-request
//! delay, and input-order aggregation into a [`BatchResult`]. One URL's
//! failure never aborts the batch; the coordinator's correctness
//! invariant is `processed_count == success_count + failure_count ==
//! input length`.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

use sitesift_shared::{
    BatchResult, BatchSummary, DecisionSource, PageResult, Result, ScrapeConfig, SitesiftError,
};

use crate::pipeline::PagePipeline;

/// Runs the page pipeline over many URLs under bounded concurrency.
pub struct BatchCoordinator {
    pipeline: Arc<PagePipeline>,
    config: Arc<ScrapeConfig>,
}

impl BatchCoordinator {
    /// Create a coordinator around an assembled pipeline.
    pub fn new(pipeline: Arc<PagePipeline>, config: Arc<ScrapeConfig>) -> Self {
        Self { pipeline, config }
    }

    /// Create a coordinator (and its pipeline) from config alone.
    pub fn from_config(config: Arc<ScrapeConfig>) -> Result<Self> {
        let pipeline = Arc::new(PagePipeline::from_config(config.clone())?);
        Ok(Self::new(pipeline, config))
    }

    /// Process a batch of URLs. Always returns a complete [`BatchResult`]
    /// describing every input URL's fate; only contract violations
    /// (empty input, zero concurrency) abort the call.
    #[instrument(skip_all, fields(urls = urls.len()))]
    pub async fn process_many(&self, urls: &[String]) -> Result<BatchResult> {
        if urls.is_empty() {
            return Err(SitesiftError::validation("input URL list is empty"));
        }
        if self.config.max_concurrency == 0 {
            return Err(SitesiftError::validation("max_concurrency must be at least 1"));
        }

        info!(
            concurrency = self.config.max_concurrency,
            delay_ms = self.config.delay_between_requests.as_millis() as u64,
            max_retries = self.config.max_retries,
            "starting batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut handles = Vec::with_capacity(urls.len());

        for (index, url) in urls.iter().enumerate() {
            let pipeline = self.pipeline.clone();
            let semaphore = semaphore.clone();
            let delay = self.config.delay_between_requests;
            let url = url.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");

                // Per-slot rate limiting: the delay runs inside the held
                // permit, bounding fetch-start rate without serializing
                // the whole batch.
                if !delay.is_zero() {
                    sleep(delay).await;
                }

                (index, pipeline.process_url(&url).await)
            }));
        }

        // Slots are pre-sized by index so the aggregation order matches
        // the input order regardless of completion order.
        let mut slots: Vec<Option<PageResult>> = urls.iter().map(|_| None).collect();

        for handle in handles {
            match handle.await {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => {
                    // The failing URL is identified by the slot left empty.
                    warn!(error = %e, "pipeline task failed to complete");
                }
            }
        }

        let batch = aggregate(urls, slots);

        info!(
            processed = batch.processed_count,
            succeeded = batch.success_count,
            failed = batch.failure_count,
            "batch complete"
        );

        Ok(batch)
    }
}

/// Single-pass aggregation of per-URL outcomes into a [`BatchResult`].
fn aggregate(urls: &[String], slots: Vec<Option<PageResult>>) -> BatchResult {
    let mut results: Vec<PageResult> = Vec::new();
    let mut errors: BTreeMap<String, String> = BTreeMap::new();
    let mut summary = BatchSummary::default();
    let mut score_total = 0.0;

    for (url, slot) in urls.iter().zip(slots) {
        match slot {
            Some(result) if result.is_success() => {
                if let Some(content) = &result.content {
                    summary.total_images += content.images.len();
                    summary.total_videos += content.videos.len();
                    summary.total_links += content.links.len();
                }
                if let Some(assessment) = &result.assessment {
                    score_total += assessment.score;
                }
                if result
                    .decision
                    .as_ref()
                    .is_some_and(|d| d.source == DecisionSource::Ai)
                {
                    summary.ai_decisions += 1;
                }
                results.push(result);
            }
            Some(result) => {
                let reason = result
                    .error
                    .unwrap_or_else(|| "unknown failure".to_string());
                errors.insert(url.clone(), reason);
            }
            None => {
                errors.insert(url.clone(), "pipeline task failed to complete".to_string());
            }
        }
    }

    let processed_count = urls.len();
    let success_count = results.len();

    summary.average_quality_score = if success_count > 0 {
        (score_total / success_count as f64 * 100.0).round() / 100.0
    } else {
        0.0
    };

    BatchResult {
        results,
        errors,
        processed_count,
        success_count,
        // Derived from the input length so the count invariant holds even
        // when duplicate failing URLs collapse into one errors entry.
        failure_count: processed_count - success_count,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use sitesift_agent::DecisionAgent;
    use sitesift_plugins::{Plugin, PluginMetadata, PluginRegistry};
    use sitesift_shared::{
        AppConfig, FetchError, FetchStatus, PluginStatus, ResultMap,
    };

    use crate::fetch::{FetchResponse, Fetcher};

    use super::*;

    fn page_body(title: &str) -> String {
        format!(
            "<html><head><title>{title}</title></head><body>\
             <h1>{title}</h1>\
             <p>A paragraph with enough text to be counted as content.</p>\
             <img src=\"/a.png\" alt=\"a\">\
             <a href=\"/next\">Next</a>\
             </body></html>"
        )
    }

    /// Scripted per-URL fetch behavior with attempt counting.
    enum Behavior {
        Ok(String),
        /// Err(Timeout) on every attempt.
        AlwaysTimeout,
        Http(u16),
        /// Fail with timeouts this many times, then succeed.
        FailThenOk(u32, String),
        /// Succeed after sleeping.
        Slow(Duration, String),
    }

    struct ScriptedFetcher {
        behaviors: HashMap<String, Behavior>,
        attempts: Mutex<HashMap<String, u32>>,
    }

    impl ScriptedFetcher {
        fn new(behaviors: Vec<(&str, Behavior)>) -> Self {
            Self {
                behaviors: behaviors
                    .into_iter()
                    .map(|(url, b)| (url.to_string(), b))
                    .collect(),
                attempts: Mutex::new(HashMap::new()),
            }
        }

        fn attempts_for(&self, url: &str) -> u32 {
            *self.attempts.lock().unwrap().get(url).unwrap_or(&0)
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> std::result::Result<FetchResponse, FetchError> {
            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                let counter = attempts.entry(url.to_string()).or_insert(0);
                *counter += 1;
                *counter
            };

            match self.behaviors.get(url) {
                Some(Behavior::Ok(body)) => Ok(FetchResponse {
                    status: 200,
                    body: body.clone(),
                }),
                Some(Behavior::AlwaysTimeout) => Err(FetchError::Timeout),
                Some(Behavior::Http(code)) => Ok(FetchResponse {
                    status: *code,
                    body: String::new(),
                }),
                Some(Behavior::FailThenOk(failures, body)) => {
                    if attempt <= *failures {
                        Err(FetchError::Timeout)
                    } else {
                        Ok(FetchResponse {
                            status: 200,
                            body: body.clone(),
                        })
                    }
                }
                Some(Behavior::Slow(delay, body)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(FetchResponse {
                        status: 200,
                        body: body.clone(),
                    })
                }
                None => Err(FetchError::Connection(format!("no script for {url}"))),
            }
        }
    }

    fn test_config(max_retries: u32) -> Arc<ScrapeConfig> {
        let mut config = ScrapeConfig::from(&AppConfig::default());
        config.delay_between_requests = Duration::ZERO;
        config.retry_backoff = Duration::from_millis(1);
        config.request_timeout = Duration::from_secs(5);
        config.max_retries = max_retries;
        config.max_concurrency = 4;
        Arc::new(config)
    }

    fn coordinator_with(
        fetcher: Arc<ScriptedFetcher>,
        config: Arc<ScrapeConfig>,
    ) -> BatchCoordinator {
        let pipeline = PagePipeline::new(
            fetcher,
            DecisionAgent::heuristic_only(config.summary_length),
            Vec::new(),
            Vec::new(),
            config.clone(),
        );
        BatchCoordinator::new(Arc::new(pipeline), config)
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn end_to_end_ok_timeout_and_404() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            ("https://ok.example/", Behavior::Ok(page_body("Ok"))),
            ("https://timeout.example/", Behavior::AlwaysTimeout),
            ("https://404.example/", Behavior::Http(404)),
        ]));
        let coordinator = coordinator_with(fetcher.clone(), test_config(1));

        let batch = coordinator
            .process_many(&urls(&[
                "https://ok.example/",
                "https://timeout.example/",
                "https://404.example/",
            ]))
            .await
            .unwrap();

        assert_eq!(batch.processed_count, 3);
        assert_eq!(batch.success_count, 1);
        assert_eq!(batch.failure_count, 2);
        assert_eq!(batch.results.len(), 1);
        assert_eq!(batch.results[0].fetch_status, FetchStatus::Ok);
        assert!(batch.errors.contains_key("https://timeout.example/"));
        assert!(batch.errors.contains_key("https://404.example/"));

        // max_retries = 1 → two attempts for the transient failure,
        // a single attempt for the terminal 404.
        assert_eq!(fetcher.attempts_for("https://timeout.example/"), 2);
        assert_eq!(fetcher.attempts_for("https://404.example/"), 1);
    }

    #[tokio::test]
    async fn count_invariant_holds_for_all_batches() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            ("https://a.example/", Behavior::Ok(page_body("A"))),
            ("https://b.example/", Behavior::Http(500)),
            ("https://c.example/", Behavior::Ok(page_body("C"))),
            ("https://d.example/", Behavior::Http(403)),
        ]));
        let coordinator = coordinator_with(fetcher, test_config(0));

        let input = urls(&[
            "https://a.example/",
            "https://b.example/",
            "https://c.example/",
            "https://d.example/",
        ]);
        let batch = coordinator.process_many(&input).await.unwrap();

        assert_eq!(batch.processed_count, input.len());
        assert_eq!(
            batch.processed_count,
            batch.success_count + batch.failure_count
        );
        assert_eq!(batch.success_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn result_order_matches_input_despite_completion_order() {
        // The first URL is the slowest, so completion order is the
        // reverse of input order.
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            (
                "https://slow.example/",
                Behavior::Slow(Duration::from_secs(3), page_body("Slow")),
            ),
            (
                "https://medium.example/",
                Behavior::Slow(Duration::from_secs(2), page_body("Medium")),
            ),
            (
                "https://fast.example/",
                Behavior::Slow(Duration::from_secs(1), page_body("Fast")),
            ),
        ]));
        let coordinator = coordinator_with(fetcher, test_config(0));

        let input = urls(&[
            "https://slow.example/",
            "https://medium.example/",
            "https://fast.example/",
        ]);
        let batch = coordinator.process_many(&input).await.unwrap();

        assert_eq!(batch.success_count, 3);
        let ordered: Vec<&str> = batch.results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            ordered,
            vec![
                "https://slow.example/",
                "https://medium.example/",
                "https://fast.example/"
            ]
        );
    }

    #[tokio::test]
    async fn transient_failures_are_retried_to_success() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![(
            "https://flaky.example/",
            Behavior::FailThenOk(2, page_body("Flaky")),
        )]));
        let coordinator = coordinator_with(fetcher.clone(), test_config(2));

        let batch = coordinator
            .process_many(&urls(&["https://flaky.example/"]))
            .await
            .unwrap();

        assert_eq!(batch.success_count, 1);
        assert_eq!(fetcher.attempts_for("https://flaky.example/"), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_yield_exactly_max_attempts() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![(
            "https://down.example/",
            Behavior::AlwaysTimeout,
        )]));
        let coordinator = coordinator_with(fetcher.clone(), test_config(2));

        let batch = coordinator
            .process_many(&urls(&["https://down.example/"]))
            .await
            .unwrap();

        assert_eq!(batch.failure_count, 1);
        assert!(batch.errors.contains_key("https://down.example/"));
        // max_retries = 2 → exactly 3 total attempts
        assert_eq!(fetcher.attempts_for("https://down.example/"), 3);
    }

    #[tokio::test]
    async fn non_transient_http_errors_are_not_retried() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![(
            "https://gone.example/",
            Behavior::Http(410),
        )]));
        let coordinator = coordinator_with(fetcher.clone(), test_config(3));

        let batch = coordinator
            .process_many(&urls(&["https://gone.example/"]))
            .await
            .unwrap();

        assert_eq!(batch.failure_count, 1);
        assert_eq!(fetcher.attempts_for("https://gone.example/"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_is_bounded_by_the_semaphore() {
        struct CountingFetcher {
            current: AtomicU32,
            peak: AtomicU32,
        }

        #[async_trait]
        impl Fetcher for CountingFetcher {
            async fn fetch(
                &self,
                _url: &str,
            ) -> std::result::Result<FetchResponse, FetchError> {
                let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                self.current.fetch_sub(1, Ordering::SeqCst);
                Ok(FetchResponse {
                    status: 200,
                    body: "<html><p>Enough body text for the pipeline.</p></html>".into(),
                })
            }
        }

        let fetcher = Arc::new(CountingFetcher {
            current: AtomicU32::new(0),
            peak: AtomicU32::new(0),
        });

        let mut config = ScrapeConfig::from(&AppConfig::default());
        config.delay_between_requests = Duration::ZERO;
        config.max_concurrency = 2;
        config.max_retries = 0;
        let config = Arc::new(config);

        let pipeline = PagePipeline::new(
            fetcher.clone(),
            DecisionAgent::heuristic_only(config.summary_length),
            Vec::new(),
            Vec::new(),
            config.clone(),
        );
        let coordinator = BatchCoordinator::new(Arc::new(pipeline), config);

        let input: Vec<String> = (0..8).map(|n| format!("https://s{n}.example/")).collect();
        let batch = coordinator.process_many(&input).await.unwrap();

        assert_eq!(batch.success_count, 8);
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn failing_plugin_never_blocks_the_result() {
        struct FailingPlugin;

        impl Plugin for FailingPlugin {
            fn process(&self, _data: &ResultMap) -> sitesift_shared::Result<ResultMap> {
                Err(SitesiftError::plugin("broken", "always fails"))
            }

            fn metadata(&self) -> PluginMetadata {
                PluginMetadata {
                    name: "broken".into(),
                    version: "1.0.0".into(),
                    description: "always fails".into(),
                }
            }
        }

        let fetcher = Arc::new(ScriptedFetcher::new(vec![(
            "https://ok.example/",
            Behavior::Ok(page_body("Ok")),
        )]));

        let config = test_config(0);
        let registry = PluginRegistry::with_builtins();
        let (mut plugins, unknown) = registry.build(&["word-stats".to_string()]);
        plugins.insert(0, Box::new(FailingPlugin));

        let pipeline = PagePipeline::new(
            fetcher,
            DecisionAgent::heuristic_only(config.summary_length),
            plugins,
            unknown,
            config.clone(),
        );
        let coordinator = BatchCoordinator::new(Arc::new(pipeline), config);

        let batch = coordinator
            .process_many(&urls(&["https://ok.example/"]))
            .await
            .unwrap();

        assert_eq!(batch.success_count, 1);
        let result = &batch.results[0];
        assert_eq!(result.plugin_outcomes.len(), 2);
        assert_eq!(result.plugin_outcomes[0].status, PluginStatus::Failed);
        assert!(!result.plugin_outcomes[0]
            .error
            .as_deref()
            .unwrap_or_default()
            .is_empty());
        assert_eq!(result.plugin_outcomes[1].status, PluginStatus::Applied);
        assert!(result.enriched.contains_key("word_stats"));
    }

    #[tokio::test]
    async fn heuristic_decisions_for_every_url_when_ai_is_off() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            ("https://a.example/", Behavior::Ok(page_body("A"))),
            ("https://b.example/", Behavior::Ok(page_body("B"))),
        ]));
        let coordinator = coordinator_with(fetcher, test_config(0));

        let batch = coordinator
            .process_many(&urls(&["https://a.example/", "https://b.example/"]))
            .await
            .unwrap();

        assert_eq!(batch.success_count, 2);
        for result in &batch.results {
            assert_eq!(
                result.decision.as_ref().expect("decision").source,
                DecisionSource::Heuristic
            );
        }
        assert_eq!(batch.summary.ai_decisions, 0);
    }

    #[tokio::test]
    async fn batch_summary_totals_cover_successes_only() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            ("https://a.example/", Behavior::Ok(page_body("A"))),
            ("https://b.example/", Behavior::Http(404)),
        ]));
        let coordinator = coordinator_with(fetcher, test_config(0));

        let batch = coordinator
            .process_many(&urls(&["https://a.example/", "https://b.example/"]))
            .await
            .unwrap();

        // page_body has one image and one link
        assert_eq!(batch.summary.total_images, 1);
        assert_eq!(batch.summary.total_links, 1);
        assert!(batch.summary.average_quality_score > 0.0);
    }

    #[tokio::test]
    async fn empty_input_is_a_validation_error() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![]));
        let coordinator = coordinator_with(fetcher, test_config(0));

        let err = coordinator.process_many(&[]).await.unwrap_err();
        assert!(matches!(err, SitesiftError::Validation { .. }));
    }

    #[tokio::test]
    async fn zero_concurrency_is_a_validation_error() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![]));
        let mut config = ScrapeConfig::from(&AppConfig::default());
        config.max_concurrency = 0;
        let config = Arc::new(config);

        let pipeline = PagePipeline::new(
            fetcher,
            DecisionAgent::heuristic_only(config.summary_length),
            Vec::new(),
            Vec::new(),
            config.clone(),
        );
        let coordinator = BatchCoordinator::new(Arc::new(pipeline), config);

        let err = coordinator
            .process_many(&urls(&["https://a.example/"]))
            .await
            .unwrap_err();
        assert!(matches!(err, SitesiftError::Validation { .. }));
    }
}
