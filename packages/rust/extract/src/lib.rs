//! Content extraction and quality scoring for fetched pages.
//!
//! [`extract`] turns a raw HTML body into a normalized
//! [`ContentModel`](sitesift_shared::ContentModel); [`score`] computes a
//! composite richness score from it. Neither touches the network.

mod extractor;
mod scorer;

pub use extractor::{ExtractOptions, extract};
pub use scorer::score;
