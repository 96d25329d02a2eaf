//! Core domain types for the Sitesift scraping pipeline.
//!
//! Everything that flows between pipeline stages lives here: the
//! normalized [`ContentModel`], the scorer's [`QualityAssessment`], the
//! decision agent's [`AgentDecision`], per-plugin [`PluginOutcome`]s, and
//! the per-URL/per-batch aggregates [`PageResult`] and [`BatchResult`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Open mapping handed through the plugin chain.
pub type ResultMap = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// ContentModel
// ---------------------------------------------------------------------------

/// A reference to an image or video found on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Absolute URL of the media resource.
    pub url: String,
    /// Alt text, empty when absent.
    #[serde(default)]
    pub alt: String,
    /// Title attribute, empty when absent.
    #[serde(default)]
    pub title: String,
}

/// A hyperlink found on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRef {
    /// Absolute URL of the link target.
    pub url: String,
    /// Visible link text.
    pub text: String,
    /// True when the resolved host differs from the source page's host.
    pub is_external: bool,
}

/// Kind of an HTML list block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Unordered,
    Ordered,
}

/// An `<ul>`/`<ol>` block with its item texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBlock {
    pub kind: ListKind,
    pub items: Vec<String>,
}

/// Normalized structured representation of a fetched page's content.
///
/// Built once by the extractor; `full_text` is derived from headings and
/// paragraphs in document order and is never mutated independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentModel {
    /// Absolute URL the content was fetched from.
    pub url: String,
    /// Page title from `<title>`, possibly empty.
    #[serde(default)]
    pub title: String,
    /// Heading texts grouped by tag level ("h1".."h6"), document order.
    #[serde(default)]
    pub headings: BTreeMap<String, Vec<String>>,
    /// Paragraph texts in document order.
    #[serde(default)]
    pub paragraphs: Vec<String>,
    /// List blocks in document order.
    #[serde(default)]
    pub lists: Vec<ListBlock>,
    /// Headings + paragraphs concatenated in document order,
    /// whitespace-collapsed.
    #[serde(default)]
    pub full_text: String,
    /// Images in document order.
    #[serde(default)]
    pub images: Vec<MediaRef>,
    /// Videos (native and embedded players) in document order.
    #[serde(default)]
    pub videos: Vec<MediaRef>,
    /// Links in document order.
    #[serde(default)]
    pub links: Vec<LinkRef>,
    /// `<meta>` tag contents keyed by name/property.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// SHA-256 hex digest of the raw fetched body.
    #[serde(default)]
    pub content_hash: String,
}

impl ContentModel {
    /// Number of distinct heading levels present (h1..h6).
    pub fn heading_level_count(&self) -> usize {
        self.headings.values().filter(|v| !v.is_empty()).count()
    }

    /// Total media references (images + videos).
    pub fn media_count(&self) -> usize {
        self.images.len() + self.videos.len()
    }
}

// ---------------------------------------------------------------------------
// QualityAssessment
// ---------------------------------------------------------------------------

/// Coarse three-bucket classification of a page's content quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RichnessLabel {
    Thin,
    Moderate,
    Rich,
}

impl RichnessLabel {
    /// Deterministic, monotonic bucketing with inclusive lower bounds:
    /// score < 4 → Thin; 4 ≤ score < 7 → Moderate; score ≥ 7 → Rich.
    pub fn from_score(score: f64) -> Self {
        if score >= 7.0 {
            Self::Rich
        } else if score >= 4.0 {
            Self::Moderate
        } else {
            Self::Thin
        }
    }
}

/// Composite richness score for a page's extracted content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Composite score in [0.0, 10.0].
    pub score: f64,
    /// Bucketed label, always derived from `score`.
    pub richness_label: RichnessLabel,
}

impl QualityAssessment {
    /// Build an assessment from a raw score, clamping to [0, 10] and
    /// deriving the label.
    pub fn from_score(score: f64) -> Self {
        let score = score.clamp(0.0, 10.0);
        Self {
            score,
            richness_label: RichnessLabel::from_score(score),
        }
    }
}

// ---------------------------------------------------------------------------
// AgentDecision
// ---------------------------------------------------------------------------

/// Which strategy produced an [`AgentDecision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Ai,
    Heuristic,
}

/// Analysis/decision output for a page, produced by the AI backend or the
/// deterministic heuristic fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDecision {
    /// Content summary; may be empty on the heuristic path for empty pages.
    pub summary: String,
    /// Main topics of the page.
    pub main_topics: BTreeSet<String>,
    /// Content quality score in [0, 10]; distinct from the scorer's
    /// composite score on the AI path, mirrors it on the heuristic path.
    pub content_quality_score: f64,
    /// Priority score in [0, 10].
    pub priority_score: f64,
    /// Recommended follow-up actions, ordered.
    pub recommended_actions: Vec<String>,
    /// Which path produced this decision.
    pub source: DecisionSource,
}

// ---------------------------------------------------------------------------
// PluginOutcome
// ---------------------------------------------------------------------------

/// Status of a single plugin in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    Applied,
    Skipped,
    Failed,
}

/// Record of one plugin's run within the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginOutcome {
    /// Identifier of the plugin.
    pub plugin_name: String,
    /// Whether the plugin ran, was skipped, or failed.
    pub status: PluginStatus,
    /// Captured error message for failed/skipped plugins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Plugin-specific fields this plugin merged into the result.
    #[serde(default, skip_serializing_if = "ResultMap::is_empty")]
    pub fields: ResultMap,
}

// ---------------------------------------------------------------------------
// PageResult
// ---------------------------------------------------------------------------

/// Final fetch status of a page pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Ok,
    FetchFailed,
    Timeout,
}

/// The aggregate result of one URL's pipeline execution.
///
/// Created once per URL; immutable after construction except for the
/// plugin-appended `enriched` fields, which are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// Unique identifier for this result (UUID v7, time-sortable).
    pub id: Uuid,
    /// The input URL.
    pub url: String,
    /// Outcome of the fetch stage.
    pub fetch_status: FetchStatus,
    /// Extracted content; `None` on degraded results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentModel>,
    /// Quality assessment; `None` on degraded results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<QualityAssessment>,
    /// Agent decision; `None` on degraded results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<AgentDecision>,
    /// Per-plugin outcomes in chain order.
    #[serde(default)]
    pub plugin_outcomes: Vec<PluginOutcome>,
    /// Cumulative plugin-contributed fields.
    #[serde(default, skip_serializing_if = "ResultMap::is_empty")]
    pub enriched: ResultMap,
    /// When the pipeline finished for this URL.
    pub processed_at: DateTime<Utc>,
    /// Terminal failure reason for degraded results; `None` on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageResult {
    /// A degraded result for a URL whose pipeline failed terminally.
    pub fn degraded(url: impl Into<String>, fetch_status: FetchStatus, error: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            url: url.into(),
            fetch_status,
            content: None,
            assessment: None,
            decision: None,
            plugin_outcomes: Vec::new(),
            enriched: ResultMap::new(),
            processed_at: Utc::now(),
            error: Some(error.into()),
        }
    }

    /// Whether this result represents a fully processed page.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.fetch_status == FetchStatus::Ok
    }
}

// ---------------------------------------------------------------------------
// BatchResult
// ---------------------------------------------------------------------------

/// Content totals across the successful results of one batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_images: usize,
    pub total_videos: usize,
    pub total_links: usize,
    /// Mean composite quality score across successful results.
    pub average_quality_score: f64,
    /// Number of decisions produced by the AI path.
    pub ai_decisions: usize,
}

/// The aggregate result of one batch invocation.
///
/// `results` holds the successful [`PageResult`]s in input-URL order;
/// `errors` records every URL that produced no result. Counts are derived
/// by the coordinator in a single aggregation pass and always satisfy
/// `processed_count == success_count + failure_count == input length`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Successful results, ordered to match the input URL sequence.
    pub results: Vec<PageResult>,
    /// URL → failure reason for URLs without a result.
    pub errors: BTreeMap<String, String>,
    /// Total URLs processed (== input length).
    pub processed_count: usize,
    /// URLs that produced a successful result.
    pub success_count: usize,
    /// URLs that failed terminally.
    pub failure_count: usize,
    /// Content totals across successful results.
    pub summary: BatchSummary,
}
