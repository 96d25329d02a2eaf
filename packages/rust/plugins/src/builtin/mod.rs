//! Built-in plugins shipped with the registry.

mod readability;
mod seo;
mod word_stats;

pub use readability::ReadabilityPlugin;
pub use seo::SeoPlugin;
pub use word_stats::WordStatsPlugin;

use sitesift_shared::{ContentModel, Result, ResultMap, SitesiftError};

/// Deserialize the content model out of the chain mapping.
///
/// Every built-in works from the extracted content; a seed without it is a
/// plugin failure (isolated by the chain runner like any other).
fn content_from(plugin: &str, data: &ResultMap) -> Result<ContentModel> {
    let value = data
        .get("content")
        .ok_or_else(|| SitesiftError::plugin(plugin, "result mapping has no 'content' field"))?;

    serde_json::from_value(value.clone())
        .map_err(|e| SitesiftError::plugin(plugin, format!("invalid content model: {e}")))
}
