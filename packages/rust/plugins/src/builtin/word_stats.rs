//! Word frequency statistics plugin.

use std::collections::HashMap;

use serde_json::json;

use sitesift_shared::{Result, ResultMap};

use crate::{Plugin, PluginMetadata};

/// Number of top words reported.
const TOP_WORD_COUNT: usize = 10;

/// Reports character/word counts and the most frequent words.
pub struct WordStatsPlugin;

impl Plugin for WordStatsPlugin {
    fn process(&self, data: &ResultMap) -> Result<ResultMap> {
        let content = super::content_from("word-stats", data)?;

        let character_count = content.full_text.chars().count();
        let words: Vec<String> = content
            .full_text
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|w| !w.is_empty())
            .collect();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for word in &words {
            *counts.entry(word).or_insert(0) += 1;
        }

        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

        let top_words: Vec<serde_json::Value> = ranked
            .into_iter()
            .take(TOP_WORD_COUNT)
            .map(|(word, count)| json!({ "word": word, "count": count }))
            .collect();

        let mut next = data.clone();
        next.insert(
            "word_stats".to_string(),
            json!({
                "character_count": character_count,
                "word_count": words.len(),
                "top_words": top_words,
            }),
        );

        Ok(next)
    }

    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            name: "word-stats".into(),
            version: "1.0.0".into(),
            description: "Character/word counts and top word frequencies".into(),
        }
    }
}
