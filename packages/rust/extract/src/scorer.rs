//! Composite content quality scoring.
//!
//! Pure and deterministic: the same [`ContentModel`] always produces the
//! same [`QualityAssessment`]. The weights and caps are fixed,
//! implementation-defined constants exercised by the tests below.

use sitesift_shared::{ContentModel, QualityAssessment};

/// Characters of `full_text` at which the text-volume measure saturates.
const TEXT_SATURATION_CHARS: usize = 2000;
/// Distinct heading levels at which the structure measure saturates.
const HEADING_LEVEL_CAP: usize = 4;
/// Media references at which the media measure saturates.
const MEDIA_CAP: usize = 8;
/// Links at which the link measure saturates.
const LINK_CAP: usize = 20;

const TEXT_WEIGHT: f64 = 0.40;
const STRUCTURE_WEIGHT: f64 = 0.25;
const MEDIA_WEIGHT: f64 = 0.20;
const LINK_WEIGHT: f64 = 0.15;

/// Score a content model's richness on a 0–10 scale.
///
/// Combines normalized measures of text volume, structural richness,
/// media count, and link count with fixed weights; the label is derived
/// from the clamped score.
pub fn score(content: &ContentModel) -> QualityAssessment {
    let text = normalized(content.full_text.chars().count(), TEXT_SATURATION_CHARS);
    let structure = normalized(content.heading_level_count(), HEADING_LEVEL_CAP);
    let media = normalized(content.media_count(), MEDIA_CAP);
    let links = normalized(content.links.len(), LINK_CAP);

    let composite = text * TEXT_WEIGHT
        + structure * STRUCTURE_WEIGHT
        + media * MEDIA_WEIGHT
        + links * LINK_WEIGHT;

    QualityAssessment::from_score(composite)
}

/// Normalize a count to [0, 10], saturating at `cap`.
fn normalized(count: usize, cap: usize) -> f64 {
    (count.min(cap) as f64 / cap as f64) * 10.0
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sitesift_shared::{LinkRef, MediaRef, RichnessLabel};

    use super::*;

    fn empty_content() -> ContentModel {
        ContentModel {
            url: "https://example.com/".into(),
            title: String::new(),
            headings: BTreeMap::new(),
            paragraphs: Vec::new(),
            lists: Vec::new(),
            full_text: String::new(),
            images: Vec::new(),
            videos: Vec::new(),
            links: Vec::new(),
            metadata: BTreeMap::new(),
            content_hash: String::new(),
        }
    }

    fn image(n: usize) -> MediaRef {
        MediaRef {
            url: format!("https://example.com/{n}.png"),
            alt: String::new(),
            title: String::new(),
        }
    }

    fn link(n: usize) -> LinkRef {
        LinkRef {
            url: format!("https://example.com/{n}"),
            text: format!("link {n}"),
            is_external: false,
        }
    }

    #[test]
    fn empty_content_scores_zero_and_thin() {
        let assessment = score(&empty_content());
        assert_eq!(assessment.score, 0.0);
        assert_eq!(assessment.richness_label, RichnessLabel::Thin);
    }

    #[test]
    fn saturated_content_scores_ten_and_rich() {
        let mut content = empty_content();
        content.full_text = "x".repeat(TEXT_SATURATION_CHARS * 2);
        for level in 1..=4 {
            content
                .headings
                .insert(format!("h{level}"), vec!["h".into()]);
        }
        content.images = (0..MEDIA_CAP).map(image).collect();
        content.links = (0..LINK_CAP * 2).map(link).collect();

        let assessment = score(&content);
        assert_eq!(assessment.score, 10.0);
        assert_eq!(assessment.richness_label, RichnessLabel::Rich);
    }

    #[test]
    fn text_only_saturation_lands_on_moderate_boundary() {
        // Saturated text volume alone contributes 10 * 0.40 = 4.0, which
        // must fall in the Moderate bucket (inclusive lower bound).
        let mut content = empty_content();
        content.full_text = "y".repeat(TEXT_SATURATION_CHARS);

        let assessment = score(&content);
        assert!((assessment.score - 4.0).abs() < 1e-9);
        assert_eq!(assessment.richness_label, RichnessLabel::Moderate);
    }

    #[test]
    fn score_is_always_in_bounds() {
        let mut content = empty_content();
        content.full_text = "z".repeat(100_000);
        content.images = (0..500).map(image).collect();
        content.links = (0..500).map(link).collect();
        for level in 1..=6 {
            content
                .headings
                .insert(format!("h{level}"), vec!["h".into()]);
        }

        let assessment = score(&content);
        assert!(assessment.score >= 0.0 && assessment.score <= 10.0);
    }

    #[test]
    fn scoring_is_deterministic_and_monotonic_in_text() {
        let mut thin = empty_content();
        thin.full_text = "a".repeat(100);
        let mut thick = empty_content();
        thick.full_text = "a".repeat(1500);

        let s1 = score(&thin);
        let s2 = score(&thin);
        assert_eq!(s1.score, s2.score);
        assert!(score(&thick).score > s1.score);
    }
}
