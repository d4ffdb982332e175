//! GitHub release feed client.
//!
//! One `GET .../releases/latest` per call, shared by the kernel watch loop
//! and the self-update checker. Every failure mode is recoverable by
//! design: callers translate [`FeedError`] into "unresolved version" or
//! "no update available" rather than propagating it.

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Latest-release feed URL for a GitHub repository (`owner/repo`).
pub fn latest_release_url(repository: &str) -> String {
    format!("https://api.github.com/repos/{repository}/releases/latest")
}

/// Latest-release feed for the watcher itself.
pub const WATCHER_FEED_URL: &str =
    "https://api.github.com/repos/scottlz0310/wsl-kernel-watcher/releases/latest";

/// User-Agent sent with feed requests. GitHub rejects requests without one.
const USER_AGENT: &str = concat!("wsl-kernel-watcher/", env!("CARGO_PKG_VERSION"));

/// Request timeout for a single feed fetch.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Release feed query error. Recoverable at every call site.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The feed answered with a non-success HTTP status.
    #[error("release feed returned HTTP {status}")]
    Unavailable { status: reqwest::StatusCode },

    /// The response body was not valid JSON.
    #[error("malformed release feed response: {0}")]
    Parse(String),

    /// The response carried no usable `tag_name`.
    #[error("release feed response has no tag_name")]
    TagMissing,

    /// Transport-level failure (connect, timeout, TLS).
    #[error("release feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The request was cancelled before completing.
    #[error("release feed request cancelled")]
    Cancelled,
}

/// Tag and release page extracted from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestRelease {
    /// The version-identifying tag, e.g. `linux-msft-wsl-5.15.167.4`.
    pub tag: String,
    /// Release page URL; empty string when the feed omits it.
    pub release_url: String,
}

/// Typed view of the release document. Every field is optional; absence is
/// handled per field rather than failing the whole parse.
#[derive(Debug, Deserialize)]
struct ReleaseDocument {
    #[serde(default)]
    tag_name: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
}

/// HTTP client for GitHub latest-release feeds.
#[derive(Debug, Clone)]
pub struct ReleaseFeedClient {
    http: reqwest::Client,
}

impl ReleaseFeedClient {
    /// Build a client with the watcher's User-Agent and request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WatcherError::Config`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new() -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| crate::WatcherError::Config(format!("http client: {e}")))?;
        Ok(Self { http })
    }

    /// Use a caller-configured client as-is. The caller's User-Agent and
    /// timeout choices are never overwritten.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Fetch the latest release tag from `feed_url`.
    ///
    /// # Errors
    ///
    /// All failure modes are reported as [`FeedError`]; none are fatal to
    /// the watch loop or the self-update check.
    pub async fn latest_release(
        &self,
        feed_url: &str,
        cancel: &CancellationToken,
    ) -> Result<LatestRelease, FeedError> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(FeedError::Cancelled),
            response = self.http.get(feed_url).send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Unavailable { status });
        }

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(FeedError::Cancelled),
            body = response.text() => body?,
        };

        let document: ReleaseDocument =
            serde_json::from_str(&body).map_err(|e| FeedError::Parse(e.to_string()))?;

        let tag = document
            .tag_name
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(FeedError::TagMissing)?
            .to_owned();

        Ok(LatestRelease {
            tag,
            release_url: document.html_url.unwrap_or_default(),
        })
    }
}
