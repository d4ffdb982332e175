//! Kernel watch loop.
//!
//! [`KernelWatcher`] owns a background task that checks the installed WSL2
//! kernel against the latest published release once per tick. Every status
//! line goes to both the broadcast status stream and the [`LogStore`].
//! Failures inside an iteration become an `Error: …` status line; the loop
//! itself only ends on cancellation.

use crate::kernel_query::KernelQuery;
use crate::log_store::LogStore;
use crate::notify::UpdateNotifier;
use crate::release_feed::ReleaseFeedClient;
use crate::settings::AppSettings;
use crate::version::VersionMatcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Buffered status lines per subscriber.
const STATUS_CHANNEL_CAPACITY: usize = 256;

/// Everything one check iteration needs. Cloned into spawned tasks; the
/// single-flight gate is shared through the clone so a manual check and a
/// scheduled check never run concurrently.
#[derive(Clone)]
struct CheckContext {
    feed: ReleaseFeedClient,
    kernel: KernelQuery,
    matcher: VersionMatcher,
    log: Arc<LogStore>,
    notifier: Arc<dyn UpdateNotifier>,
    status_tx: broadcast::Sender<String>,
    feed_url: String,
    notifications_enabled: bool,
    flight_gate: Arc<Mutex<()>>,
}

impl CheckContext {
    fn report_status(&self, message: &str) {
        let _ = self.status_tx.send(message.to_owned());
        self.log.append(message);
    }

    /// One scheduled iteration: waits for any in-flight manual check first.
    async fn check_once(&self, cancel: &CancellationToken) {
        let _flight = self.flight_gate.lock().await;
        self.run_check(cancel).await;
    }

    /// One manual iteration: skipped when a check is already in flight.
    async fn check_once_if_idle(&self, cancel: &CancellationToken) {
        match self.flight_gate.try_lock() {
            Ok(_flight) => self.run_check(cancel).await,
            Err(_) => self.report_status("Check already in progress. Skipping manual check."),
        }
    }

    async fn run_check(&self, cancel: &CancellationToken) {
        if let Err(e) = self.try_check(cancel).await {
            self.report_status(&format!("Error: {e}"));
        }
    }

    async fn try_check(&self, cancel: &CancellationToken) -> crate::Result<()> {
        self.report_status("Checking kernel versions...");

        let current = self.kernel.current_version(cancel).await;
        let latest = match self.feed.latest_release(&self.feed_url, cancel).await {
            Ok(release) => Some(release.tag),
            Err(e) => {
                debug!(error = %e, "latest kernel version unresolved");
                None
            }
        };

        let (Some(current), Some(latest)) = (current, latest) else {
            self.report_status("Unable to determine versions (WSL or GitHub API failed)");
            return Ok(());
        };

        self.report_status(&format!("Current: {current} | Latest: {latest}"));

        if self.matcher.is_newer(&latest, &current) {
            self.report_status("Newer kernel detected. Sending notification.");
            if self.notifications_enabled {
                self.notifier.notify_update_available(&current, &latest)?;
            }
        } else {
            self.report_status("Already up to date.");
        }

        Ok(())
    }
}

/// Background watcher comparing the installed kernel against the release feed.
pub struct KernelWatcher {
    ctx: CheckContext,
    interval: Duration,
    cancel: CancellationToken,
    loop_task: Option<JoinHandle<()>>,
}

impl KernelWatcher {
    /// Create a watcher from settings. The interval and the notification
    /// toggle are read here once; runtime settings changes need a restart.
    pub fn new(
        settings: &AppSettings,
        feed: ReleaseFeedClient,
        log: Arc<LogStore>,
        notifier: Arc<dyn UpdateNotifier>,
    ) -> Self {
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        let feed_url = crate::release_feed::latest_release_url(&settings.kernel_repository);
        Self {
            ctx: CheckContext {
                feed,
                kernel: KernelQuery::default(),
                matcher: VersionMatcher::new(),
                log,
                notifier,
                status_tx,
                feed_url,
                notifications_enabled: settings.notifications_enabled,
                flight_gate: Arc::new(Mutex::new(())),
            },
            interval: Duration::from_secs(u64::from(settings.check_interval_hours) * 3600),
            cancel: CancellationToken::new(),
            loop_task: None,
        }
    }

    /// Override the check interval (useful for testing).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Substitute the local kernel query command.
    pub fn with_kernel_query(mut self, kernel: KernelQuery) -> Self {
        self.ctx.kernel = kernel;
        self
    }

    /// Point the watcher at a different release feed (useful for testing).
    pub fn with_feed_url(mut self, feed_url: impl Into<String>) -> Self {
        self.ctx.feed_url = feed_url.into();
        self
    }

    /// Subscribe to the status line stream.
    ///
    /// Every line a check iteration emits is delivered, in order, to each
    /// subscriber; the same lines also land in the log store.
    pub fn subscribe_status(&self) -> broadcast::Receiver<String> {
        self.ctx.status_tx.subscribe()
    }

    /// Start the background loop. Idempotent: the loop task is created at
    /// most once, a second call is a no-op.
    pub fn start(&mut self) {
        if self.loop_task.is_some() {
            return;
        }
        let ctx = self.ctx.clone();
        let interval = self.interval;
        let cancel = self.cancel.clone();
        self.loop_task = Some(tokio::spawn(run_loop(ctx, interval, cancel)));
    }

    /// Trigger a single check outside the schedule, fire-and-forget.
    ///
    /// Skipped (with a log line) when another check is already in flight.
    pub fn check_now(&self) {
        let ctx = self.ctx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            ctx.check_once_if_idle(&cancel).await;
        });
    }

    /// Stop the loop: cancel, then await the background task to completion.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.loop_task.take() {
            // A JoinError here means the loop panicked; nothing to do at
            // shutdown beyond ignoring it.
            let _ = task.await;
        }
        info!("kernel watcher stopped");
    }
}

/// The iterate-then-wait cycle. The first check runs immediately; later
/// checks follow the fixed-rate tick, so the wait is measured from the tick
/// schedule rather than from the end of the previous iteration.
async fn run_loop(ctx: CheckContext, interval: Duration, cancel: CancellationToken) {
    info!(interval_secs = interval.as_secs(), "kernel watcher started");
    let mut ticker = tokio::time::interval(interval);
    // An iteration that outruns the interval must not trigger back-to-back
    // catch-up checks; the next check waits for the next scheduled tick.
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => ctx.check_once(&cancel).await,
        }
    }
}
