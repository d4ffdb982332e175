//! Error types for the kernel watcher.

/// Top-level error type for the version-watch engine.
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    /// Invalid construction-time configuration (directory, threshold, interval).
    #[error("config error: {0}")]
    Config(String),

    /// Release feed query error.
    #[error("feed error: {0}")]
    Feed(#[from] crate::release_feed::FeedError),

    /// Update notification delivery error.
    #[error("notification error: {0}")]
    Notify(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, WatcherError>;
