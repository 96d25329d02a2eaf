//! Orchestration core: fetch collaborator, per-URL page pipeline, and the
//! concurrent batch coordinator.
//!
//! Data flows strictly downward: [`BatchCoordinator`] → [`PagePipeline`] →
//! extractor → scorer → decision agent → plugin chain → aggregated result.

pub mod batch;
pub mod fetch;
pub mod pipeline;

pub use batch::BatchCoordinator;
pub use fetch::{FetchResponse, Fetcher, HttpFetcher};
pub use pipeline::PagePipeline;
