//! HTTP fetch collaborator.
//!
//! [`Fetcher`] is the capability boundary the pipeline fetches through;
//! [`HttpFetcher`] is the shipped `reqwest` implementation. A fetcher
//! returns the status code and body for any HTTP response it got — the
//! pipeline classifies non-success statuses, so stub fetchers in tests
//! can exercise every failure class without a socket.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use sitesift_shared::{FetchError, Result, ScrapeConfig, SitesiftError};

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

/// Capability contract for page fetching.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a URL. Transport-level failures map to [`FetchError`];
    /// any HTTP response, success or not, is an `Ok` with its status.
    async fn fetch(&self, url: &str) -> std::result::Result<FetchResponse, FetchError>;
}

/// `reqwest`-backed fetcher with the configured timeout, user agent,
/// TLS verification, and redirect policy.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher from the runtime config.
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(5)
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout + Duration::from_secs(1))
            .redirect(redirect)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| {
                SitesiftError::config(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client })
    }

    /// Validate a URL before any network use.
    pub fn validate_url(url: &str) -> std::result::Result<Url, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => Err(FetchError::InvalidUrl(format!(
                "{url}: unsupported scheme '{other}'"
            ))),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<FetchResponse, FetchError> {
        let parsed = Self::validate_url(url)?;

        debug!(url = %parsed, "fetching page");

        let response = self
            .client
            .get(parsed.as_str())
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_reqwest_error)?;

        Ok(FetchResponse { status, body })
    }
}

/// Map transport-level `reqwest` failures onto the fetch taxonomy.
fn classify_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Connection(e.to_string())
    }
}
