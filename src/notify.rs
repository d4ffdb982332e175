//! Update notification seam.
//!
//! The engine hands `(current, latest)` version strings to a collaborator;
//! OS-level toast delivery and click handling live outside the core. The
//! default implementation just records the notification via `tracing`.

use crate::error::Result;
use tracing::info;

/// Collaborator that surfaces a kernel update to the user.
pub trait UpdateNotifier: Send + Sync {
    /// Notify that `latest` is newer than the running `current` kernel.
    ///
    /// # Errors
    ///
    /// Delivery failures are converted into an `Error: …` status line by the
    /// watch loop; they never stop the loop.
    fn notify_update_available(&self, current: &str, latest: &str) -> Result<()>;
}

/// Release page URL for a kernel tag, for collaborators that open the
/// release on user action.
pub fn release_tag_url(repository: &str, tag: &str) -> String {
    format!("https://github.com/{repository}/releases/tag/{tag}")
}

/// Notifier that logs instead of raising an OS notification.
#[derive(Debug, Default)]
pub struct LogOnlyNotifier;

impl UpdateNotifier for LogOnlyNotifier {
    fn notify_update_available(&self, current: &str, latest: &str) -> Result<()> {
        info!(current, latest, "kernel update available");
        Ok(())
    }
}
