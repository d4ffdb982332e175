//! Rotating append-only diagnostic log with a live line stream.
//!
//! Every appended message becomes a `[yyyy-MM-dd HH:mm:ss] message` line in
//! the active log file and is broadcast to subscribers. The two paths are
//! deliberately decoupled: a failed disk write never suppresses the
//! broadcast, so the UI stream stays live even while the file is locked or
//! the disk is full. The log is a best-effort diagnostic aid, not a
//! durability guarantee.

use crate::error::{Result, WatcherError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::warn;

/// Active log file name. Rotated siblings are `watcher-<timestamp>.log`.
const ACTIVE_LOG_NAME: &str = "watcher.log";

/// Default rotation threshold (1 MB).
pub const DEFAULT_MAX_BYTES: u64 = 1_000_000;

/// Broadcast capacity for the line stream. Slow subscribers that lag past
/// this many lines miss the oldest ones, which is acceptable for a UI feed.
const LINE_CHANNEL_CAPACITY: usize = 256;

/// Size-rotated append-only log store.
///
/// Shared by reference between the watch loop, the self-update checker and
/// UI collaborators; the append+rotate sequence is serialized internally so
/// concurrent appenders cannot interleave a rotation with a write.
pub struct LogStore {
    directory: PathBuf,
    active_path: PathBuf,
    max_bytes: u64,
    line_tx: broadcast::Sender<String>,
    // Guards the check-size / maybe-rotate / write sequence.
    write_gate: Mutex<()>,
}

impl LogStore {
    /// Create a store writing to `directory`, rotating past `max_bytes`.
    ///
    /// Creates the directory if absent.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::Config`] for an empty directory path or a
    /// zero rotation threshold, [`WatcherError::Io`] if the directory cannot
    /// be created.
    pub fn new(directory: impl AsRef<Path>, max_bytes: u64) -> Result<Self> {
        let directory = directory.as_ref();
        if directory.as_os_str().is_empty() {
            return Err(WatcherError::Config(
                "log directory must not be empty".to_owned(),
            ));
        }
        if max_bytes == 0 {
            return Err(WatcherError::Config(
                "log rotation threshold must be at least 1 byte".to_owned(),
            ));
        }

        fs::create_dir_all(directory)?;
        let (line_tx, _) = broadcast::channel(LINE_CHANNEL_CAPACITY);

        Ok(Self {
            directory: directory.to_path_buf(),
            active_path: directory.join(ACTIVE_LOG_NAME),
            max_bytes,
            line_tx,
            write_gate: Mutex::new(()),
        })
    }

    /// Create a store at the default platform location with the default
    /// rotation threshold.
    pub fn at_default_location() -> Result<Self> {
        Self::new(default_log_dir(), DEFAULT_MAX_BYTES)
    }

    /// Directory the log files live in.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Subscribe to the live line stream.
    ///
    /// Each subscriber receives every line appended after the subscription,
    /// in append order.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.line_tx.subscribe()
    }

    /// Append a timestamped line to the active log file and broadcast it.
    ///
    /// Disk failures (rotation or write) are swallowed after a diagnostic
    /// trace; the broadcast fires regardless.
    pub fn append(&self, message: &str) {
        let line = format!(
            "[{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        );

        {
            // A poisoned gate means another appender panicked mid-write; the
            // file state is still usable, so keep writing.
            let _gate = self
                .write_gate
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            self.rotate_if_needed();
            if let Err(e) = self.write_line(&line) {
                warn!(error = %e, path = %self.active_path.display(), "failed to write log line");
            }
        }

        // Send only fails when no subscriber exists, which is fine.
        let _ = self.line_tx.send(line);
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.active_path)?;
        writeln!(file, "{line}")
    }

    /// Rename the active file to a timestamped archive once it exceeds the
    /// threshold. Failures are swallowed; the next append retries.
    ///
    /// Archive names carry a second-resolution timestamp; two rotations in
    /// the same second would collide. Known limitation.
    fn rotate_if_needed(&self) {
        let size = match fs::metadata(&self.active_path) {
            Ok(meta) => meta.len(),
            Err(_) => return,
        };
        if size <= self.max_bytes {
            return;
        }

        let archive = self.directory.join(format!(
            "watcher-{}.log",
            chrono::Local::now().format("%Y%m%d%H%M%S")
        ));
        if let Err(e) = fs::rename(&self.active_path, &archive) {
            warn!(error = %e, archive = %archive.display(), "failed to rotate log file");
        }
    }
}

/// Default log directory: platform data-local dir / `wsl-kernel-watcher/logs`.
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("wsl-kernel-watcher")
        .join("logs")
}
