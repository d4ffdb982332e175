//! WSL kernel watcher: tracks WSL2 kernel releases and notifies on updates.
//!
//! The engine periodically compares the locally installed kernel version
//! (`wsl.exe uname -r`) against the latest release tag published on GitHub
//! and hands a notification to a collaborator when the remote version is
//! newer.
//!
//! # Architecture
//!
//! The watcher is built from small, independently testable pieces:
//! - **Version comparison**: strict 4-part extraction for kernel strings,
//!   lenient tag parsing for release tags ([`version`])
//! - **Log store**: size-rotated append-only log file whose formatted lines
//!   are also broadcast to live subscribers ([`log_store`])
//! - **Release feed**: GitHub `releases/latest` fetch shared by the watch
//!   loop and the self-update check ([`release_feed`])
//! - **Watch loop**: fixed-rate background task driving one check per tick
//!   ([`watcher`])
//! - **Self-update**: one-shot check of the watcher's own release feed
//!   ([`self_update`])

pub mod error;
pub mod kernel_query;
pub mod log_store;
pub mod notify;
pub mod release_feed;
pub mod self_update;
pub mod settings;
pub mod version;
pub mod watcher;

pub use error::{Result, WatcherError};
pub use log_store::LogStore;
pub use notify::UpdateNotifier;
pub use release_feed::{FeedError, LatestRelease, ReleaseFeedClient};
pub use self_update::{AutoUpdateResult, SelfUpdateChecker};
pub use settings::{AppSettings, SettingsStore};
pub use version::{KernelVersion, VersionMatcher};
pub use watcher::KernelWatcher;
