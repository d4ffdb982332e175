//! Application settings persistence.
//!
//! Settings live in `settings.json` under the platform data directory.
//! Loading falls back to defaults when the file is missing or corrupt;
//! saving is best-effort. Interval validation lives here; the watch loop
//! reads the interval once at construction and trusts it.

use crate::error::{Result, WatcherError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const SETTINGS_FILE_NAME: &str = "settings.json";

/// Bounds for the check interval, in hours.
pub const MIN_INTERVAL_HOURS: u32 = 1;
pub const MAX_INTERVAL_HOURS: u32 = 24;

/// Persisted application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Hours between scheduled kernel checks (1–24).
    pub check_interval_hours: u32,
    /// Whether a detected update raises a notification. The status line is
    /// emitted either way.
    pub notifications_enabled: bool,
    /// Watched kernel repository as `owner/repo`.
    pub kernel_repository: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            check_interval_hours: 2,
            notifications_enabled: true,
            kernel_repository: "microsoft/WSL2-Linux-Kernel".to_owned(),
        }
    }
}

/// Loads, holds and saves [`AppSettings`].
pub struct SettingsStore {
    path: PathBuf,
    settings: AppSettings,
}

impl SettingsStore {
    /// Open (or initialize) the settings stored under `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::Config`] for an empty directory path,
    /// [`WatcherError::Io`] if the directory cannot be created.
    pub fn new(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref();
        if directory.as_os_str().is_empty() {
            return Err(WatcherError::Config(
                "settings directory must not be empty".to_owned(),
            ));
        }
        fs::create_dir_all(directory)?;

        let path = directory.join(SETTINGS_FILE_NAME);
        let settings = Self::load_or_default(&path);
        Ok(Self { path, settings })
    }

    /// Open the settings at the default platform location.
    pub fn at_default_location() -> Result<Self> {
        Self::new(default_settings_dir())
    }

    /// Current settings.
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Set the check interval, rejecting out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`WatcherError::Config`] when `hours` is outside 1–24.
    pub fn update_check_interval(&mut self, hours: u32) -> Result<()> {
        if !(MIN_INTERVAL_HOURS..=MAX_INTERVAL_HOURS).contains(&hours) {
            return Err(WatcherError::Config(format!(
                "check interval must be between {MIN_INTERVAL_HOURS} and {MAX_INTERVAL_HOURS} hours, got {hours}"
            )));
        }
        self.settings.check_interval_hours = hours;
        self.save();
        Ok(())
    }

    /// Toggle update notifications.
    pub fn set_notifications_enabled(&mut self, enabled: bool) {
        self.settings.notifications_enabled = enabled;
        self.save();
    }

    /// Persist the current settings. Best-effort: failures are logged and
    /// swallowed so a read-only disk never breaks the watcher.
    pub fn save(&self) {
        let json = match serde_json::to_string_pretty(&self.settings) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize settings");
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, json) {
            warn!(error = %e, path = %self.path.display(), "failed to save settings");
        }
    }

    fn load_or_default(path: &Path) -> AppSettings {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(_) => return AppSettings::default(),
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!(error = %e, path = %path.display(), "corrupt settings file, using defaults");
            AppSettings::default()
        })
    }
}

/// Default settings directory: platform data-local dir / `wsl-kernel-watcher`.
pub fn default_settings_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("wsl-kernel-watcher")
}
