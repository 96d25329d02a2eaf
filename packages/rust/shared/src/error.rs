//! Error types for Sitesift.
//!
//! Library crates use [`SitesiftError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.
//!
//! The fetch and AI collaborators have their own error enums
//! ([`FetchError`], [`AiError`]) because their failure classes drive
//! retry and fallback decisions in the pipeline.

use std::path::PathBuf;

/// Top-level error type for all Sitesift operations.
#[derive(Debug, thiserror::Error)]
pub enum SitesiftError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// HTTP fetch failure.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Content extraction failure (input not parseable as markup at all).
    #[error("extraction error: {message}")]
    Extraction { message: String },

    /// AI backend failure. Always recoverable — the decision agent falls
    /// back to the heuristic path instead of propagating this.
    #[error("ai error: {0}")]
    Ai(#[from] AiError),

    /// A plugin failed while processing a result mapping. Isolated per
    /// plugin; never terminal for the pipeline.
    #[error("plugin '{plugin}' failed: {message}")]
    Plugin { plugin: String, message: String },

    /// Programming-contract violation (invalid configuration, empty URL
    /// list). The only error class allowed to abort a whole batch call.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SitesiftError>;

impl SitesiftError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an extraction error from any displayable message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    /// Create a plugin error for the given plugin name.
    pub fn plugin(plugin: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// FetchError
// ---------------------------------------------------------------------------

/// Failure classes for the fetch collaborator.
///
/// Transient classes (timeouts, connection failures, server errors) are
/// eligible for retry with backoff; terminal classes (client errors,
/// malformed URLs) fail the URL immediately.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The request exceeded its time budget.
    #[error("request timed out")]
    Timeout,

    /// Connection-level failure (DNS, reset, refused).
    #[error("connection error: {0}")]
    Connection(String),

    /// The server answered with a non-success status code.
    #[error("HTTP {0}")]
    Http(u16),

    /// The URL could not be parsed or has an unsupported scheme.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether this failure class is eligible for retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection(_) => true,
            Self::Http(code) => *code >= 500,
            Self::InvalidUrl(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// AiError
// ---------------------------------------------------------------------------

/// Failure classes for the AI analysis collaborator.
///
/// Every variant triggers the heuristic fallback in the decision agent;
/// none of them is terminal for a URL.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AiError {
    /// Backend not configured, unreachable, or returned a server error.
    #[error("AI backend unavailable: {0}")]
    Unavailable(String),

    /// The analysis call exceeded its time budget.
    #[error("AI analysis timed out")]
    Timeout,

    /// The backend rejected the request for quota/rate reasons.
    #[error("AI quota exceeded")]
    QuotaExceeded,

    /// The backend answered, but the payload could not be parsed.
    #[error("malformed AI response: {0}")]
    Malformed(String),
}
