//! Self-update check against the watcher's own release feed.
//!
//! One-shot, never errors: any feed failure or unparsable tag collapses to
//! the canonical no-update result so callers can always render something.

use crate::log_store::LogStore;
use crate::release_feed::{ReleaseFeedClient, WATCHER_FEED_URL};
use crate::version::KernelVersion;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The running build's version string.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Outcome of a self-update check. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoUpdateResult {
    /// Version of the running build.
    pub current_version: KernelVersion,
    /// Latest published version (equal to current when no update exists).
    pub latest_version: KernelVersion,
    /// True iff `latest_version > current_version`.
    pub has_update: bool,
    /// Raw feed tag, absent when no update was resolved.
    pub tag: Option<String>,
    /// Release page URL; empty string when the feed omits it.
    pub release_url: String,
}

impl AutoUpdateResult {
    /// The canonical zero-result: latest == current, no tag, empty URL.
    pub fn no_update(current: KernelVersion) -> Self {
        Self {
            current_version: current,
            latest_version: current,
            has_update: false,
            tag: None,
            release_url: String::new(),
        }
    }
}

/// One-shot checker for a newer build of the watcher itself.
pub struct SelfUpdateChecker {
    feed: ReleaseFeedClient,
    log: Arc<LogStore>,
    current: KernelVersion,
    feed_url: String,
}

impl SelfUpdateChecker {
    /// Create a checker for the running build.
    pub fn new(feed: ReleaseFeedClient, log: Arc<LogStore>) -> Self {
        let current = KernelVersion::parse_lenient(CURRENT_VERSION)
            .unwrap_or(KernelVersion::new(0, 0, 0, 0));
        Self {
            feed,
            log,
            current,
            feed_url: WATCHER_FEED_URL.to_owned(),
        }
    }

    /// Override the version treated as currently running.
    pub fn with_current_version(mut self, current: KernelVersion) -> Self {
        self.current = current;
        self
    }

    /// Override the release feed URL.
    pub fn with_feed_url(mut self, feed_url: impl Into<String>) -> Self {
        self.feed_url = feed_url.into();
        self
    }

    /// Check the feed for a newer build.
    ///
    /// Never errors: feed failures and unparsable tags are logged and
    /// reported as [`AutoUpdateResult::no_update`].
    pub async fn check_for_updates(&self, cancel: &CancellationToken) -> AutoUpdateResult {
        let release = match self.feed.latest_release(&self.feed_url, cancel).await {
            Ok(release) => release,
            Err(e) => {
                self.log.append(&format!("Self-update check failed: {e}"));
                return AutoUpdateResult::no_update(self.current);
            }
        };

        let latest = match KernelVersion::parse_lenient(&release.tag) {
            Some(latest) => latest,
            None => {
                debug!(tag = %release.tag, "self-update tag did not parse as a version");
                return AutoUpdateResult::no_update(self.current);
            }
        };

        AutoUpdateResult {
            current_version: self.current,
            latest_version: latest,
            has_update: latest > self.current,
            tag: Some(release.tag),
            release_url: release.release_url,
        }
    }
}
