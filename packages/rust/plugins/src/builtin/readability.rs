//! Readability statistics plugin.

use serde_json::json;

use sitesift_shared::{Result, ResultMap};

use crate::{Plugin, PluginMetadata};

/// Computes sentence statistics and a simple readability score.
pub struct ReadabilityPlugin;

impl Plugin for ReadabilityPlugin {
    fn process(&self, data: &ResultMap) -> Result<ResultMap> {
        let content = super::content_from("readability", data)?;

        let word_count = content.full_text.split_whitespace().count();
        let sentence_count = content
            .full_text
            .chars()
            .filter(|c| matches!(c, '.' | '!' | '?'))
            .count();

        let avg_sentence_length = if sentence_count > 0 {
            word_count as f64 / sentence_count as f64
        } else {
            0.0
        };

        let mut next = data.clone();
        next.insert(
            "readability".to_string(),
            json!({
                "word_count": word_count,
                "sentence_count": sentence_count,
                "avg_sentence_length": round2(avg_sentence_length),
                "readability_score": readability_score(word_count, sentence_count),
            }),
        );

        Ok(next)
    }

    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            name: "readability".into(),
            version: "1.0.0".into(),
            description: "Sentence statistics and a simple readability score".into(),
        }
    }
}

/// Score on a 0–10 scale: shorter average sentences read easier.
/// Zero when the text has no sentence punctuation at all.
fn readability_score(word_count: usize, sentence_count: usize) -> f64 {
    if sentence_count == 0 {
        return 0.0;
    }
    let avg_sentence_length = word_count as f64 / sentence_count as f64;
    round2((10.0 - avg_sentence_length / 10.0).max(0.0))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
