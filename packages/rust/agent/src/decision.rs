//! Strategy selection between AI-backed and heuristic analysis.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use sitesift_shared::{AgentDecision, AiConfig, ContentModel, DecisionSource, QualityAssessment};

use crate::backend::{AiBackend, AnalysisInput, AnalysisPayload};
use crate::heuristic::heuristic_decision;

/// Produces one [`AgentDecision`] per page, preferring the AI backend and
/// falling back to the deterministic heuristic.
///
/// The fallback discipline is the component's central invariant: a
/// missing, slow, or erroring backend can never abort a pipeline — it only
/// changes the decision's `source`.
pub struct DecisionAgent {
    backend: Option<Arc<dyn AiBackend>>,
    config: AiConfig,
    summary_length: usize,
}

impl DecisionAgent {
    /// Create an agent. `backend` may be `None` when AI is unconfigured.
    pub fn new(backend: Option<Arc<dyn AiBackend>>, config: AiConfig, summary_length: usize) -> Self {
        Self {
            backend,
            config,
            summary_length,
        }
    }

    /// An agent that always takes the heuristic path.
    pub fn heuristic_only(summary_length: usize) -> Self {
        Self::new(None, AiConfig::default(), summary_length)
    }

    /// Whether the AI path can be attempted at all.
    pub fn ai_enabled(&self) -> bool {
        self.config.enable_ai_analysis && self.backend.is_some()
    }

    /// Decide on a page. Total: always returns a decision.
    pub async fn decide(
        &self,
        content: &ContentModel,
        assessment: &QualityAssessment,
    ) -> AgentDecision {
        if let (true, Some(backend)) = (self.config.enable_ai_analysis, &self.backend) {
            let input = AnalysisInput::from_content(content, assessment);
            let budget = Duration::from_secs(self.config.timeout_secs);

            match timeout(budget, backend.analyze(&input)).await {
                Ok(Ok(payload)) => {
                    debug!(url = %content.url, "AI analysis succeeded");
                    return decision_from_payload(payload);
                }
                Ok(Err(e)) => {
                    warn!(url = %content.url, error = %e, "AI analysis failed, falling back to heuristic");
                }
                Err(_) => {
                    warn!(url = %content.url, budget_secs = self.config.timeout_secs, "AI analysis timed out, falling back to heuristic");
                }
            }
        }

        heuristic_decision(content, assessment, self.summary_length)
    }
}

/// Map a backend payload into a decision with `source = Ai`.
fn decision_from_payload(payload: AnalysisPayload) -> AgentDecision {
    AgentDecision {
        summary: payload.summary,
        main_topics: payload.main_topics.into_iter().collect::<BTreeSet<_>>(),
        content_quality_score: payload.content_quality_score,
        priority_score: payload.priority_score,
        recommended_actions: payload.recommended_actions,
        source: DecisionSource::Ai,
    }
}
