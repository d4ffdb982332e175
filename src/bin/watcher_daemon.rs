//! Headless watcher daemon.
//!
//! Runs the kernel watch loop until Ctrl-C, echoing every status line to
//! stderr alongside the rotating log file. Tray/UI frontends consume the
//! same status stream through the library instead of this binary.

use std::sync::Arc;
use wsl_kernel_watcher::notify::LogOnlyNotifier;
use wsl_kernel_watcher::{KernelWatcher, LogStore, ReleaseFeedClient, SettingsStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings_store = SettingsStore::at_default_location()?;
    let settings = settings_store.settings().clone();
    tracing::info!(
        interval_hours = settings.check_interval_hours,
        repository = %settings.kernel_repository,
        "starting kernel watcher"
    );

    let log = Arc::new(LogStore::at_default_location()?);
    let feed = ReleaseFeedClient::new()?;
    let notifier = Arc::new(LogOnlyNotifier);

    let mut watcher = KernelWatcher::new(&settings, feed, Arc::clone(&log), notifier);
    let mut status = watcher.subscribe_status();
    watcher.start();

    // Mirror status lines to stderr until shutdown.
    let echo_task = tokio::spawn(async move {
        while let Ok(line) = status.recv().await {
            eprintln!("{line}");
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    watcher.shutdown().await;
    echo_task.abort();

    tracing::info!("kernel watcher shut down cleanly");
    Ok(())
}
