//! Per-URL processing pipeline: fetch → extract → score → decide → plugins.
//!
//! `process_url` is total — every failure mode degrades into a
//! [`PageResult`] rather than an error. The only stage allowed to retry is
//! the fetch; everything after a successful fetch runs synchronously and
//! cannot abort the pipeline.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{sleep, timeout};
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use sitesift_agent::{DecisionAgent, OpenAiBackend};
use sitesift_extract::{ExtractOptions, extract, score};
use sitesift_plugins::{Plugin, PluginRegistry, run_chain, skipped_outcome};
use sitesift_shared::{
    AgentDecision, ContentModel, FetchError, FetchStatus, PageResult, PluginOutcome,
    QualityAssessment, Result, ResultMap, ScrapeConfig,
};

use crate::fetch::{Fetcher, HttpFetcher};

/// Retry backoff is capped at this delay regardless of attempt count.
const BACKOFF_CAP: Duration = Duration::from_secs(10);

/// Composes the extractor, scorer, decision agent, and plugin chain into a
/// single per-URL pipeline.
pub struct PagePipeline {
    fetcher: Arc<dyn Fetcher>,
    agent: DecisionAgent,
    plugins: Vec<Box<dyn Plugin>>,
    unknown_plugins: Vec<String>,
    config: Arc<ScrapeConfig>,
}

impl PagePipeline {
    /// Assemble a pipeline from explicit collaborators.
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        agent: DecisionAgent,
        plugins: Vec<Box<dyn Plugin>>,
        unknown_plugins: Vec<String>,
        config: Arc<ScrapeConfig>,
    ) -> Self {
        Self {
            fetcher,
            agent,
            plugins,
            unknown_plugins,
            config,
        }
    }

    /// Assemble a pipeline from config alone: HTTP fetcher, the built-in
    /// plugin registry, and an AI backend when one is configured.
    pub fn from_config(config: Arc<ScrapeConfig>) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config)?);

        let backend = if config.ai.enable_ai_analysis {
            match std::env::var(&config.ai.api_key_env) {
                Ok(key) if !key.is_empty() => {
                    Some(Arc::new(OpenAiBackend::new(&config.ai, key).map_err(
                        sitesift_shared::SitesiftError::from,
                    )?) as Arc<dyn sitesift_agent::AiBackend>)
                }
                _ => {
                    warn!(
                        env = %config.ai.api_key_env,
                        "AI analysis enabled but no API key found; using heuristic decisions"
                    );
                    None
                }
            }
        } else {
            None
        };

        let agent = DecisionAgent::new(backend, config.ai.clone(), config.summary_length);

        let registry = PluginRegistry::with_builtins();
        let (plugins, unknown_plugins) = registry.build(&config.plugins_enabled);

        Ok(Self::new(fetcher, agent, plugins, unknown_plugins, config))
    }

    /// Process one URL end to end. Never fails: terminal errors produce a
    /// degraded [`PageResult`].
    #[instrument(skip_all, fields(url = %url))]
    pub async fn process_url(&self, url: &str) -> PageResult {
        let body = match self.fetch_with_retry(url).await {
            Ok(body) => body,
            Err(e) => {
                let status = match e {
                    FetchError::Timeout => FetchStatus::Timeout,
                    _ => FetchStatus::FetchFailed,
                };
                warn!(error = %e, "fetch failed terminally");
                return PageResult::degraded(url, status, e.to_string());
            }
        };

        // Parsed again here: the extractor needs a base URL for resolution.
        let source_url = match Url::parse(url) {
            Ok(u) => u,
            Err(e) => {
                return PageResult::degraded(
                    url,
                    FetchStatus::FetchFailed,
                    FetchError::InvalidUrl(format!("{url}: {e}")).to_string(),
                );
            }
        };

        let options = ExtractOptions::from(self.config.as_ref());
        let content = match extract(&body, &source_url, &options) {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "extraction failed terminally");
                return PageResult::degraded(url, FetchStatus::Ok, e.to_string());
            }
        };

        let assessment = score(&content);
        let decision = self.agent.decide(&content, &assessment).await;

        let (plugin_outcomes, enriched) = self.run_plugins(url, &content, &assessment, &decision);

        debug!(
            score = assessment.score,
            label = ?assessment.richness_label,
            decision_source = ?decision.source,
            plugins = plugin_outcomes.len(),
            "page processed"
        );

        PageResult {
            id: Uuid::now_v7(),
            url: url.to_string(),
            fetch_status: FetchStatus::Ok,
            content: Some(content),
            assessment: Some(assessment),
            decision: Some(decision),
            plugin_outcomes,
            enriched,
            processed_at: Utc::now(),
            error: None,
        }
    }

    /// Fetch with per-attempt timeout and exponential backoff on transient
    /// failures. Non-transient failures (4xx, invalid URL) fail
    /// immediately.
    async fn fetch_with_retry(&self, url: &str) -> std::result::Result<String, FetchError> {
        let max_attempts = self.config.max_retries + 1;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let outcome = match timeout(self.config.request_timeout, self.fetcher.fetch(url)).await
            {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout),
            };

            let error = match outcome {
                Ok(response) if (200..300).contains(&response.status) => {
                    return Ok(response.body);
                }
                Ok(response) => FetchError::Http(response.status),
                Err(e) => e,
            };

            if !error.is_transient() || attempt >= max_attempts {
                return Err(error);
            }

            let backoff = backoff_delay(self.config.retry_backoff, attempt);
            warn!(
                url,
                attempt,
                max_attempts,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "transient fetch failure, retrying"
            );
            sleep(backoff).await;
        }
    }

    /// Build the seed mapping and run the plugin chain over it.
    fn run_plugins(
        &self,
        url: &str,
        content: &ContentModel,
        assessment: &QualityAssessment,
        decision: &AgentDecision,
    ) -> (Vec<PluginOutcome>, ResultMap) {
        let mut outcomes: Vec<PluginOutcome> = self
            .unknown_plugins
            .iter()
            .map(|id| skipped_outcome(id))
            .collect();

        if self.plugins.is_empty() {
            return (outcomes, ResultMap::new());
        }

        let seed = build_seed(url, content, assessment, decision);
        let (chain_outcomes, _merged) = run_chain(&self.plugins, seed);

        // The enriched mapping keeps only plugin-contributed fields; the
        // seed's own keys already live on the result as typed fields.
        let mut enriched = ResultMap::new();
        for outcome in &chain_outcomes {
            for (key, value) in &outcome.fields {
                enriched.insert(key.clone(), value.clone());
            }
        }

        outcomes.extend(chain_outcomes);
        (outcomes, enriched)
    }
}

/// Serialize the pipeline state into the mapping plugins operate on.
fn build_seed(
    url: &str,
    content: &ContentModel,
    assessment: &QualityAssessment,
    decision: &AgentDecision,
) -> ResultMap {
    let mut seed = ResultMap::new();
    seed.insert("url".to_string(), serde_json::Value::String(url.to_string()));
    seed.insert(
        "title".to_string(),
        serde_json::Value::String(content.title.clone()),
    );
    if let Ok(value) = serde_json::to_value(content) {
        seed.insert("content".to_string(), value);
    }
    if let Ok(value) = serde_json::to_value(assessment) {
        seed.insert("assessment".to_string(), value);
    }
    if let Ok(value) = serde_json::to_value(decision) {
        seed.insert("decision".to_string(), value);
    }
    seed
}

/// Base delay doubled per attempt, capped.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    (base * factor).min(BACKOFF_CAP)
}
