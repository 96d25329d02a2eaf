//! HTML → [`ContentModel`] extraction.
//!
//! Works on already-fetched markup only. Partial or malformed HTML
//! degrades to empty containers; the only hard failure is input that is
//! not markup at all (empty/whitespace body).

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use sitesift_shared::{
    ContentModel, LinkRef, ListBlock, ListKind, MediaRef, Result, ScrapeConfig, SitesiftError,
};

/// Hosts treated as embedded-video players when found in iframes.
const VIDEO_PLATFORMS: [&str; 4] = ["youtube", "vimeo", "dailymotion", "twitch"];

/// Elements whose descendant text never counts as page content.
const CHROME_TAGS: [&str; 6] = ["nav", "header", "footer", "aside", "script", "style"];

/// Extraction gates and thresholds.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub extract_images: bool,
    pub extract_videos: bool,
    pub extract_links: bool,
    /// Paragraphs shorter than this many characters are dropped.
    pub min_text_length: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            extract_images: true,
            extract_videos: true,
            extract_links: true,
            min_text_length: 10,
        }
    }
}

impl From<&ScrapeConfig> for ExtractOptions {
    fn from(config: &ScrapeConfig) -> Self {
        Self {
            extract_images: config.extract_images,
            extract_videos: config.extract_videos,
            extract_links: config.extract_links,
            min_text_length: config.min_text_length,
        }
    }
}

/// Extract a normalized content model from a raw HTML body.
///
/// Fails only when `raw_html` cannot be treated as markup at all; missing
/// or malformed fragments default to empty containers.
pub fn extract(raw_html: &str, source_url: &Url, options: &ExtractOptions) -> Result<ContentModel> {
    if raw_html.trim().is_empty() {
        return Err(SitesiftError::extraction(format!(
            "{source_url}: empty document body"
        )));
    }

    let doc = Html::parse_document(raw_html);

    let title = extract_title(&doc);
    let headings = extract_headings(&doc);
    let paragraphs = extract_paragraphs(&doc, options.min_text_length);
    let lists = extract_lists(&doc);
    let full_text = extract_full_text(&doc, options.min_text_length);
    let metadata = extract_metadata(&doc);

    let images = if options.extract_images {
        extract_images(&doc, source_url)
    } else {
        Vec::new()
    };

    let videos = if options.extract_videos {
        extract_videos(&doc, source_url)
    } else {
        Vec::new()
    };

    let links = if options.extract_links {
        extract_links(&doc, source_url)
    } else {
        Vec::new()
    };

    debug!(
        url = %source_url,
        paragraphs = paragraphs.len(),
        images = images.len(),
        videos = videos.len(),
        links = links.len(),
        "content extracted"
    );

    Ok(ContentModel {
        url: source_url.to_string(),
        title,
        headings,
        paragraphs,
        lists,
        full_text,
        images,
        videos,
        links,
        metadata,
        content_hash: compute_hash(raw_html),
    })
}

/// Page title from `<title>`, empty when absent.
fn extract_title(doc: &Html) -> String {
    let sel = Selector::parse("title").unwrap();
    doc.select(&sel)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default()
}

/// Headings grouped by tag level ("h1".."h6"), document order per level.
fn extract_headings(doc: &Html) -> BTreeMap<String, Vec<String>> {
    let mut headings = BTreeMap::new();

    for level in 1..=6u8 {
        let tag = format!("h{level}");
        let sel = Selector::parse(&tag).unwrap();
        let texts: Vec<String> = doc
            .select(&sel)
            .filter(|el| !in_chrome(el))
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty())
            .collect();

        if !texts.is_empty() {
            headings.insert(tag, texts);
        }
    }

    headings
}

/// Paragraph texts in document order, excluding navigation/chrome text.
fn extract_paragraphs(doc: &Html, min_len: usize) -> Vec<String> {
    let sel = Selector::parse("p").unwrap();
    doc.select(&sel)
        .filter(|el| !in_chrome(el))
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| t.chars().count() >= min_len)
        .collect()
}

/// `<ul>`/`<ol>` blocks with their item texts.
fn extract_lists(doc: &Html) -> Vec<ListBlock> {
    let list_sel = Selector::parse("ul, ol").unwrap();
    let item_sel = Selector::parse("li").unwrap();

    doc.select(&list_sel)
        .filter(|el| !in_chrome(el))
        .map(|el| {
            let kind = if el.value().name() == "ol" {
                ListKind::Ordered
            } else {
                ListKind::Unordered
            };
            let items = el
                .select(&item_sel)
                .map(|li| collapse_whitespace(&li.text().collect::<String>()))
                .filter(|t| !t.is_empty())
                .collect();
            ListBlock { kind, items }
        })
        .filter(|block| !block.items.is_empty())
        .collect()
}

/// Headings + paragraphs concatenated in true document order.
///
/// This is the one derived field of the model: it must always equal the
/// interleaved concatenation of the heading/paragraph texts.
fn extract_full_text(doc: &Html, min_len: usize) -> String {
    let sel = Selector::parse("h1, h2, h3, h4, h5, h6, p").unwrap();
    let mut parts: Vec<String> = Vec::new();

    for el in doc.select(&sel) {
        if in_chrome(&el) {
            continue;
        }
        let text = collapse_whitespace(&el.text().collect::<String>());
        if text.is_empty() {
            continue;
        }
        // Paragraphs below the length threshold are excluded from the
        // model, so they must not leak into full_text either.
        if el.value().name() == "p" && text.chars().count() < min_len {
            continue;
        }
        parts.push(text);
    }

    parts.join(" ")
}

/// `<meta>` tag contents keyed by name/property/http-equiv.
fn extract_metadata(doc: &Html) -> BTreeMap<String, String> {
    let sel = Selector::parse("meta").unwrap();
    let mut metadata = BTreeMap::new();

    for el in doc.select(&sel) {
        let key = el
            .value()
            .attr("name")
            .or_else(|| el.value().attr("property"))
            .or_else(|| el.value().attr("http-equiv"));
        let content = el.value().attr("content");

        if let (Some(key), Some(content)) = (key, content) {
            metadata.insert(key.to_string(), content.to_string());
        }
    }

    metadata
}

/// All images, URLs resolved against the page URL.
fn extract_images(doc: &Html, base_url: &Url) -> Vec<MediaRef> {
    let sel = Selector::parse("img[src]").unwrap();
    doc.select(&sel)
        .filter_map(|el| {
            let src = el.value().attr("src")?;
            let url = resolve(base_url, src)?;
            Some(MediaRef {
                url,
                alt: el.value().attr("alt").unwrap_or_default().to_string(),
                title: el.value().attr("title").unwrap_or_default().to_string(),
            })
        })
        .collect()
}

/// Native `<video>`/`<source>` elements plus embedded-player iframes.
fn extract_videos(doc: &Html, base_url: &Url) -> Vec<MediaRef> {
    let mut videos = Vec::new();

    let video_sel = Selector::parse("video").unwrap();
    let source_sel = Selector::parse("source[src]").unwrap();

    for el in doc.select(&video_sel) {
        if let Some(src) = el.value().attr("src") {
            if let Some(url) = resolve(base_url, src) {
                videos.push(MediaRef {
                    url,
                    alt: String::new(),
                    title: el.value().attr("title").unwrap_or_default().to_string(),
                });
            }
        }
        for source in el.select(&source_sel) {
            if let Some(src) = source.value().attr("src") {
                if let Some(url) = resolve(base_url, src) {
                    videos.push(MediaRef {
                        url,
                        alt: String::new(),
                        title: String::new(),
                    });
                }
            }
        }
    }

    let iframe_sel = Selector::parse("iframe[src]").unwrap();
    for el in doc.select(&iframe_sel) {
        let src = el.value().attr("src").unwrap_or_default();
        let lowered = src.to_lowercase();
        if VIDEO_PLATFORMS.iter().any(|p| lowered.contains(p)) {
            if let Some(url) = resolve(base_url, src) {
                videos.push(MediaRef {
                    url,
                    alt: String::new(),
                    title: el.value().attr("title").unwrap_or_default().to_string(),
                });
            }
        }
    }

    videos
}

/// All links with non-empty text, resolved absolute, flagged external when
/// the resolved host differs from the page host.
fn extract_links(doc: &Html, base_url: &Url) -> Vec<LinkRef> {
    let sel = Selector::parse("a[href]").unwrap();
    let base_host = base_url.host_str().unwrap_or_default();
    let mut links = Vec::new();

    for el in doc.select(&sel) {
        let href = el.value().attr("href").unwrap_or_default();

        // Skip anchors, javascript:, mailto:
        if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:")
        {
            continue;
        }

        let text = collapse_whitespace(&el.text().collect::<String>());
        if text.is_empty() {
            continue;
        }

        if let Ok(resolved) = base_url.join(href) {
            let is_external = resolved.host_str().unwrap_or_default() != base_host;
            links.push(LinkRef {
                url: resolved.to_string(),
                text,
                is_external,
            });
        }
    }

    links
}

/// True when the element sits inside navigation/chrome markup.
fn in_chrome(el: &ElementRef) -> bool {
    el.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|e| CHROME_TAGS.contains(&e.name()))
    })
}

/// Resolve an href/src against the base URL.
fn resolve(base_url: &Url, href: &str) -> Option<String> {
    base_url.join(href).ok().map(|u| u.to_string())
}

/// Collapse runs of whitespace to single spaces and trim.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compute SHA-256 hash of content.
fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
