//! Application configuration for Sitesift.
//!
//! User config lives at `~/.sitesift/sitesift.toml`.
//! Environment variables override config file values, which override
//! defaults; CLI flags sit on top of all three.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SitesiftError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sitesift.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sitesift";

// ---------------------------------------------------------------------------
// Config structs (matching sitesift.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scraper/fetch settings.
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// AI analysis settings.
    #[serde(default)]
    pub ai: AiConfig,

    /// Plugin chain settings.
    #[serde(default)]
    pub plugins: PluginsConfig,
}

/// `[scraper]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Minimum delay between fetch starts per concurrency slot.
    #[serde(default = "default_delay_ms")]
    pub delay_between_requests_ms: u64,

    /// Per-attempt request timeout.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum retry attempts after the first failure (transient errors only).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay, doubled per retry attempt.
    #[serde(default = "default_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Maximum in-flight page pipelines.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// User-Agent header for fetch requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whether to verify TLS certificates.
    #[serde(default = "default_true")]
    pub verify_ssl: bool,

    /// Whether to follow HTTP redirects.
    #[serde(default = "default_true")]
    pub follow_redirects: bool,

    /// Extraction gates.
    #[serde(default = "default_true")]
    pub extract_images: bool,
    #[serde(default = "default_true")]
    pub extract_videos: bool,
    #[serde(default = "default_true")]
    pub extract_links: bool,

    /// Minimum paragraph length kept by the extractor.
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,

    /// Heuristic summary length in characters.
    #[serde(default = "default_summary_length")]
    pub summary_length: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            delay_between_requests_ms: default_delay_ms(),
            request_timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_backoff_ms(),
            max_concurrency: default_max_concurrency(),
            user_agent: default_user_agent(),
            verify_ssl: true,
            follow_redirects: true,
            extract_images: true,
            extract_videos: true,
            extract_links: true,
            min_text_length: default_min_text_length(),
            summary_length: default_summary_length(),
        }
    }
}

fn default_delay_ms() -> u64 {
    1000
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    3
}
fn default_backoff_ms() -> u64 {
    500
}
fn default_max_concurrency() -> u32 {
    4
}
fn default_user_agent() -> String {
    concat!("Sitesift/", env!("CARGO_PKG_VERSION")).into()
}
fn default_min_text_length() -> usize {
    10
}
fn default_summary_length() -> usize {
    200
}
fn default_true() -> bool {
    true
}

/// `[ai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Master switch for AI analysis.
    #[serde(default)]
    pub enable_ai_analysis: bool,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Model to use for analysis.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Completion token budget.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Time budget for one analysis call; exceeding it triggers the
    /// heuristic fallback.
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enable_ai_analysis: false,
            api_key_env: default_api_key_env(),
            api_base_url: default_api_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_ai_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "SITESIFT_API_KEY".into()
}
fn default_api_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f64 {
    0.3
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_ai_timeout_secs() -> u64 {
    20
}

/// `[plugins]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// Plugin identifiers to run, in chain order.
    #[serde(default)]
    pub enabled: Vec<String>,
}

// ---------------------------------------------------------------------------
// Scrape config (runtime, merged from config + env + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime scrape configuration — merged and immutable for the duration of
/// one batch call. Shared read-only across all in-flight pipelines.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub delay_between_requests: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub max_concurrency: usize,
    pub user_agent: String,
    pub verify_ssl: bool,
    pub follow_redirects: bool,
    pub extract_images: bool,
    pub extract_videos: bool,
    pub extract_links: bool,
    pub min_text_length: usize,
    pub summary_length: usize,
    /// AI settings, carried whole so the decision agent can read its
    /// enable flag and time budget.
    pub ai: AiConfig,
    /// Plugin identifiers in chain order.
    pub plugins_enabled: Vec<String>,
}

impl From<&AppConfig> for ScrapeConfig {
    fn from(config: &AppConfig) -> Self {
        let s = &config.scraper;
        Self {
            delay_between_requests: Duration::from_millis(s.delay_between_requests_ms),
            request_timeout: Duration::from_secs(s.request_timeout_secs),
            max_retries: s.max_retries,
            retry_backoff: Duration::from_millis(s.retry_backoff_ms),
            max_concurrency: s.max_concurrency as usize,
            user_agent: s.user_agent.clone(),
            verify_ssl: s.verify_ssl,
            follow_redirects: s.follow_redirects,
            extract_images: s.extract_images,
            extract_videos: s.extract_videos,
            extract_links: s.extract_links,
            min_text_length: s.min_text_length,
            summary_length: s.summary_length,
            ai: config.ai.clone(),
            plugins_enabled: config.plugins.enabled.clone(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sitesift/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SitesiftError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sitesift/sitesift.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file
/// does not exist. Environment overrides are applied on top.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    let mut config = if path.exists() {
        load_config_from(&path)?
    } else {
        tracing::debug!(?path, "config file not found, using defaults");
        AppConfig::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Load the application config from a specific file path (no env overrides).
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SitesiftError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SitesiftError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SitesiftError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SitesiftError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SitesiftError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Override config values from well-known environment variables.
fn apply_env_overrides(config: &mut AppConfig) {
    if let Some(v) = env_u64("SITESIFT_DELAY_MS") {
        config.scraper.delay_between_requests_ms = v;
    }
    if let Some(v) = env_u64("SITESIFT_TIMEOUT_SECS") {
        config.scraper.request_timeout_secs = v;
    }
    if let Some(v) = env_u64("SITESIFT_MAX_CONCURRENCY") {
        config.scraper.max_concurrency = v as u32;
    }
    if let Ok(v) = std::env::var("SITESIFT_MODEL") {
        if !v.is_empty() {
            config.ai.model = v;
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.parse().ok()
}

/// Check that the AI API key env var is set and non-empty.
/// Only required when AI analysis is enabled.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    if !config.ai.enable_ai_analysis {
        return Ok(());
    }
    let var_name = &config.ai.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(SitesiftError::config(format!(
            "AI analysis is enabled but no API key was found. Set the {var_name} environment variable."
        ))),
    }
}
