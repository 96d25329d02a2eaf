//! Shared types, error model, and configuration for Sitesift.
//!
//! This crate is the foundation depended on by all other Sitesift crates.
//! It provides:
//! - [`SitesiftError`] — the unified error type, plus the collaborator
//!   taxonomies [`FetchError`] and [`AiError`]
//! - Domain types ([`ContentModel`], [`QualityAssessment`],
//!   [`AgentDecision`], [`PageResult`], [`BatchResult`])
//! - Configuration ([`AppConfig`], [`ScrapeConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AiConfig, AppConfig, PluginsConfig, ScrapeConfig, ScraperConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{AiError, FetchError, Result, SitesiftError};
pub use types::{
    AgentDecision, BatchResult, BatchSummary, ContentModel, DecisionSource, FetchStatus,
    LinkRef, ListBlock, ListKind, MediaRef, PageResult, PluginOutcome, PluginStatus,
    QualityAssessment, ResultMap, RichnessLabel,
};
