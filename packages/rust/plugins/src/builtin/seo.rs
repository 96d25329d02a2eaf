//! SEO analysis plugin.
//!
//! Checks title/description lengths, heading structure, and image alt
//! coverage, and folds them into a 0–100 SEO score (five 20-point checks).

use serde_json::json;

use sitesift_shared::{ContentModel, Result, ResultMap};

use crate::{Plugin, PluginMetadata};

const TITLE_OPTIMAL: std::ops::RangeInclusive<usize> = 50..=60;
const DESCRIPTION_OPTIMAL: std::ops::RangeInclusive<usize> = 150..=160;
const MIN_CONTENT_CHARS: usize = 300;

/// Analyzes SEO-relevant page elements.
pub struct SeoPlugin;

impl Plugin for SeoPlugin {
    fn process(&self, data: &ResultMap) -> Result<ResultMap> {
        let content = super::content_from("seo", data)?;

        let title_len = content.title.chars().count();
        let description = content
            .metadata
            .get("description")
            .cloned()
            .unwrap_or_default();
        let description_len = description.chars().count();

        let h1_count = content
            .headings
            .get("h1")
            .map(|h| h.len())
            .unwrap_or_default();

        let total_images = content.images.len();
        let images_with_alt = content.images.iter().filter(|i| !i.alt.is_empty()).count();
        let alt_coverage = if total_images > 0 {
            images_with_alt as f64 / total_images as f64
        } else {
            0.0
        };

        let mut next = data.clone();
        next.insert(
            "seo_analysis".to_string(),
            json!({
                "title": {
                    "length": title_len,
                    "optimal_length": TITLE_OPTIMAL.contains(&title_len),
                },
                "meta_description": {
                    "present": !description.is_empty(),
                    "length": description_len,
                    "optimal_length": DESCRIPTION_OPTIMAL.contains(&description_len),
                },
                "headings": {
                    "h1_count": h1_count,
                    "has_single_h1": h1_count == 1,
                },
                "images": {
                    "total": total_images,
                    "with_alt": images_with_alt,
                    "alt_coverage": alt_coverage,
                },
                "seo_score": seo_score(&content, title_len, description_len, h1_count, alt_coverage),
            }),
        );

        Ok(next)
    }

    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            name: "seo".into(),
            version: "1.0.0".into(),
            description: "Analyze SEO elements and compute a composite SEO score".into(),
        }
    }
}

/// Five 20-point checks: title length, description length, single h1,
/// alt coverage (proportional), content volume.
fn seo_score(
    content: &ContentModel,
    title_len: usize,
    description_len: usize,
    h1_count: usize,
    alt_coverage: f64,
) -> f64 {
    let mut score = 0.0;

    if TITLE_OPTIMAL.contains(&title_len) {
        score += 20.0;
    }
    if DESCRIPTION_OPTIMAL.contains(&description_len) {
        score += 20.0;
    }
    if h1_count == 1 {
        score += 20.0;
    }
    if !content.images.is_empty() {
        score += alt_coverage * 20.0;
    }
    if content.full_text.chars().count() > MIN_CONTENT_CHARS {
        score += 20.0;
    }

    (score * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sitesift_shared::MediaRef;

    use super::*;

    fn seed_with(content: &ContentModel) -> ResultMap {
        let mut seed = ResultMap::new();
        seed.insert(
            "content".to_string(),
            serde_json::to_value(content).unwrap(),
        );
        seed
    }

    fn well_formed_content() -> ContentModel {
        let mut headings = BTreeMap::new();
        headings.insert("h1".to_string(), vec!["The One Heading".to_string()]);

        let mut metadata = BTreeMap::new();
        metadata.insert("description".to_string(), "d".repeat(155));

        ContentModel {
            url: "https://example.com/".into(),
            title: "t".repeat(55),
            headings,
            paragraphs: Vec::new(),
            lists: Vec::new(),
            full_text: "x".repeat(400),
            images: vec![MediaRef {
                url: "https://example.com/a.png".into(),
                alt: "described".into(),
                title: String::new(),
            }],
            videos: Vec::new(),
            links: Vec::new(),
            metadata,
            content_hash: String::new(),
        }
    }

    #[test]
    fn perfect_page_scores_one_hundred() {
        let content = well_formed_content();
        let result = SeoPlugin.process(&seed_with(&content)).unwrap();

        let analysis = &result["seo_analysis"];
        assert_eq!(analysis["seo_score"], 100.0);
        assert_eq!(analysis["headings"]["has_single_h1"], true);
        assert_eq!(analysis["images"]["alt_coverage"], 1.0);
    }

    #[test]
    fn bare_page_scores_zero() {
        let mut content = well_formed_content();
        content.title = String::new();
        content.headings.clear();
        content.metadata.clear();
        content.images.clear();
        content.full_text = "short".into();

        let result = SeoPlugin.process(&seed_with(&content)).unwrap();
        assert_eq!(result["seo_analysis"]["seo_score"], 0.0);
    }

    #[test]
    fn missing_content_is_a_plugin_error() {
        let err = SeoPlugin.process(&ResultMap::new()).unwrap_err();
        assert!(err.to_string().contains("seo"));
    }
}
