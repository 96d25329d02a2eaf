//! AI analysis collaborator.
//!
//! [`AiBackend`] is the capability the decision agent calls; the shipped
//! implementation [`OpenAiBackend`] speaks the OpenAI-compatible
//! chat-completions wire format and asks the model for a single JSON
//! object matching [`AnalysisPayload`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sitesift_shared::{AiConfig, AiError, ContentModel, QualityAssessment};

/// Characters of `full_text` sent to the backend.
const TEXT_SAMPLE_CHARS: usize = 3000;

// ---------------------------------------------------------------------------
// Trait + payload types
// ---------------------------------------------------------------------------

/// Condensed view of a page handed to the AI backend.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisInput {
    pub url: String,
    pub title: String,
    /// Truncated `full_text` prefix.
    pub text_sample: String,
    pub image_count: usize,
    pub video_count: usize,
    pub link_count: usize,
    /// The scorer's composite score, for the model's context.
    pub composite_score: f64,
}

impl AnalysisInput {
    /// Build an input from extracted content and its assessment.
    pub fn from_content(content: &ContentModel, assessment: &QualityAssessment) -> Self {
        Self {
            url: content.url.clone(),
            title: content.title.clone(),
            text_sample: truncate_chars(&content.full_text, TEXT_SAMPLE_CHARS),
            image_count: content.images.len(),
            video_count: content.videos.len(),
            link_count: content.links.len(),
            composite_score: assessment.score,
        }
    }
}

/// Structured analysis returned by a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub summary: String,
    #[serde(default)]
    pub main_topics: Vec<String>,
    pub content_quality_score: f64,
    pub priority_score: f64,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
}

/// Capability contract for AI content analysis.
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Analyze page content; any error triggers the heuristic fallback.
    async fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisPayload, AiError>;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// [`AiBackend`] implementation over an OpenAI-compatible HTTP API.
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl OpenAiBackend {
    /// Create a backend from AI config and the resolved API key.
    pub fn new(config: &AiConfig, api_key: String) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AiError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn build_prompt(input: &AnalysisInput) -> String {
        let stats = serde_json::json!({
            "url": input.url,
            "title": input.title,
            "image_count": input.image_count,
            "video_count": input.video_count,
            "link_count": input.link_count,
            "composite_score": input.composite_score,
        });

        format!(
            "Analyze the following web content and reply with a single JSON object \
             with exactly these fields: \"summary\" (2-3 sentences), \"main_topics\" \
             (up to 5 strings), \"content_quality_score\" (number 0-10), \
             \"priority_score\" (number 0-10), \"recommended_actions\" (strings). \
             No prose outside the JSON.\n\nPage stats: {stats}\n\nContent:\n{text}",
            text = input.text_sample,
        )
    }
}

#[async_trait]
impl AiBackend for OpenAiBackend {
    async fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisPayload, AiError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: Self::build_prompt(input),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(url = %input.url, model = %self.model, "requesting AI analysis");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AiError::Timeout
                } else {
                    AiError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AiError::QuotaExceeded);
        }
        if !status.is_success() {
            return Err(AiError::Unavailable(format!("HTTP {status}")));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiError::Malformed(e.to_string()))?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AiError::Malformed("response contained no choices".into()))?;

        parse_payload(content)
    }
}

/// Parse the model's reply, tolerating markdown code fences around the JSON.
fn parse_payload(content: &str) -> Result<AnalysisPayload, AiError> {
    let trimmed = strip_code_fences(content);
    let mut payload: AnalysisPayload =
        serde_json::from_str(trimmed).map_err(|e| AiError::Malformed(e.to_string()))?;

    payload.content_quality_score = payload.content_quality_score.clamp(0.0, 10.0);
    payload.priority_score = payload.priority_score.clamp(0.0, 10.0);
    Ok(payload)
}

/// Strip a leading/trailing markdown code fence, if present.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        // Drop an optional language tag on the fence line
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(inner) = rest.trim().strip_suffix("```") {
            return inner.trim();
        }
    }
    trimmed
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
