//! Deterministic heuristic analysis — the fallback when AI is disabled or
//! failing.
//!
//! Everything here is a pure function of the content model and its
//! assessment: the same input always yields the same decision.

use std::collections::{BTreeSet, HashMap};

use regex::Regex;

use sitesift_shared::{AgentDecision, ContentModel, DecisionSource, QualityAssessment};

/// Number of topics reported by the heuristic path.
const TOPIC_COUNT: usize = 5;

/// Minimum word length considered a topic candidate.
const MIN_TOPIC_WORD_LEN: usize = 4;

/// Common words never reported as topics.
const STOPWORDS: [&str; 48] = [
    "about", "after", "against", "also", "because", "been", "before", "being", "between",
    "both", "could", "does", "during", "each", "from", "have", "here", "into", "just", "like",
    "many", "more", "most", "much", "only", "other", "over", "should", "some", "such", "than",
    "that", "their", "them", "then", "there", "these", "they", "this", "those", "through",
    "under", "very", "were", "what", "when", "where", "which",
];

/// Produce a heuristic decision from deterministic content statistics.
pub fn heuristic_decision(
    content: &ContentModel,
    assessment: &QualityAssessment,
    summary_length: usize,
) -> AgentDecision {
    AgentDecision {
        summary: summarize(&content.full_text, summary_length),
        main_topics: top_topics(&content.full_text),
        content_quality_score: assessment.score,
        priority_score: priority_score(content),
        recommended_actions: recommended_actions(content),
        source: DecisionSource::Heuristic,
    }
}

/// Truncated `full_text` prefix on a char boundary.
fn summarize(full_text: &str, summary_length: usize) -> String {
    full_text.chars().take(summary_length).collect()
}

/// Most frequent non-stopword terms; ties broken alphabetically so the
/// result is stable across runs.
fn top_topics(full_text: &str) -> BTreeSet<String> {
    let word_re = Regex::new(r"[a-z0-9']+").unwrap();
    let lowered = full_text.to_lowercase();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for m in word_re.find_iter(&lowered) {
        let word = m.as_str();
        if word.chars().count() < MIN_TOPIC_WORD_LEN || STOPWORDS.contains(&word) {
            continue;
        }
        *counts.entry(word).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(TOPIC_COUNT)
        .map(|(word, _)| word.to_string())
        .collect()
}

/// Stepped priority score from content volume, media, and link counts.
fn priority_score(content: &ContentModel) -> f64 {
    let mut score: f64 = 0.0;

    let text_len = content.full_text.chars().count();
    if text_len > 1000 {
        score += 3.0;
    } else if text_len > 500 {
        score += 2.0;
    } else if text_len > 100 {
        score += 1.0;
    }

    if content.images.len() > 5 {
        score += 2.0;
    }
    if !content.videos.is_empty() {
        score += 3.0;
    }
    if content.links.len() > 10 {
        score += 1.0;
    }

    score.min(10.0)
}

/// Follow-up suggestions based on content shape.
fn recommended_actions(content: &ContentModel) -> Vec<String> {
    let mut actions = Vec::new();

    if content.full_text.chars().count() > 2000 {
        actions.push("Consider generating a summary for this lengthy content".to_string());
    }
    if content.images.len() > 10 {
        actions.push("High image count — consider an image optimization pass".to_string());
    }
    if !content.videos.is_empty() {
        actions.push("Video content detected — analyze for engagement potential".to_string());
    }
    if content.links.len() > 20 {
        actions.push("High link density — consider a link analysis for SEO insight".to_string());
    }

    actions
}
