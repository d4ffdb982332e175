//! Watch loop lifecycle tests: status sequence, notification dispatch,
//! unresolved-version handling, start idempotence and shutdown.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wsl_kernel_watcher::kernel_query::KernelQuery;
use wsl_kernel_watcher::notify::UpdateNotifier;
use wsl_kernel_watcher::{AppSettings, KernelWatcher, LogStore, ReleaseFeedClient, WatcherError};

const FEED_PATH: &str = "/repos/microsoft/WSL2-Linux-Kernel/releases/latest";

/// Notifier that records every `(current, latest)` pair it receives.
#[derive(Default)]
struct RecordingNotifier {
    calls: Mutex<Vec<(String, String)>>,
}

impl UpdateNotifier for RecordingNotifier {
    fn notify_update_available(&self, current: &str, latest: &str) -> wsl_kernel_watcher::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((current.to_owned(), latest.to_owned()));
        Ok(())
    }
}

async fn mock_feed(server: &MockServer, tag: &str) {
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"{{"tag_name":"{tag}","html_url":"https://example/releases/{tag}"}}"#
        )))
        .mount(server)
        .await;
}

async fn mock_slow_feed(server: &MockServer, tag: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(r#"{{"tag_name":"{tag}","html_url":""}}"#))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Notifier whose delivery always fails.
struct FailingNotifier;

impl UpdateNotifier for FailingNotifier {
    fn notify_update_available(&self, _current: &str, _latest: &str) -> wsl_kernel_watcher::Result<()> {
        Err(WatcherError::Notify("toast delivery failed".to_owned()))
    }
}

struct TestHarness {
    _log_dir: tempfile::TempDir,
    watcher: KernelWatcher,
    status: broadcast::Receiver<String>,
    notifier: Arc<RecordingNotifier>,
}

/// Build a watcher pointing at the mock feed, with `echo` standing in for
/// `wsl.exe uname -r`.
fn harness(server: &MockServer, settings: &AppSettings, local_version: &str) -> TestHarness {
    let log_dir = tempfile::tempdir().unwrap();
    let log = Arc::new(LogStore::new(log_dir.path(), 1024 * 1024).unwrap());
    let notifier = Arc::new(RecordingNotifier::default());

    let watcher = KernelWatcher::new(
        settings,
        ReleaseFeedClient::new().unwrap(),
        log,
        Arc::clone(&notifier) as Arc<dyn UpdateNotifier>,
    )
    .with_feed_url(format!("{}{}", server.uri(), FEED_PATH))
    .with_kernel_query(KernelQuery::new("echo", [local_version]))
    .with_interval(Duration::from_secs(3600));

    let status = watcher.subscribe_status();
    TestHarness {
        _log_dir: log_dir,
        watcher,
        status,
        notifier,
    }
}

async fn next_status(rx: &mut broadcast::Receiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("status line within timeout")
        .expect("status channel open")
}

#[tokio::test]
async fn detects_newer_kernel_and_notifies() {
    let server = MockServer::start().await;
    mock_feed(&server, "linux-msft-wsl-5.15.200.1").await;

    let mut h = harness(
        &server,
        &AppSettings::default(),
        "5.15.90.1-microsoft-standard-WSL2",
    );
    h.watcher.start();

    assert_eq!(next_status(&mut h.status).await, "Checking kernel versions...");
    assert_eq!(
        next_status(&mut h.status).await,
        "Current: 5.15.90.1-microsoft-standard-WSL2 | Latest: linux-msft-wsl-5.15.200.1"
    );
    assert_eq!(
        next_status(&mut h.status).await,
        "Newer kernel detected. Sending notification."
    );

    h.watcher.shutdown().await;

    let calls = h.notifier.calls.lock().unwrap();
    assert_eq!(
        calls.as_slice(),
        &[(
            "5.15.90.1-microsoft-standard-WSL2".to_owned(),
            "linux-msft-wsl-5.15.200.1".to_owned()
        )]
    );
}

#[tokio::test]
async fn up_to_date_kernel_is_not_notified() {
    let server = MockServer::start().await;
    mock_feed(&server, "linux-msft-wsl-5.15.90.1").await;

    let mut h = harness(
        &server,
        &AppSettings::default(),
        "5.15.90.1-microsoft-standard-WSL2",
    );
    h.watcher.start();

    assert_eq!(next_status(&mut h.status).await, "Checking kernel versions...");
    assert_eq!(
        next_status(&mut h.status).await,
        "Current: 5.15.90.1-microsoft-standard-WSL2 | Latest: linux-msft-wsl-5.15.90.1"
    );
    assert_eq!(next_status(&mut h.status).await, "Already up to date.");

    h.watcher.shutdown().await;
    assert!(h.notifier.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unresolved_local_version_skips_comparison() {
    let server = MockServer::start().await;
    mock_feed(&server, "linux-msft-wsl-5.15.90.1").await;

    let log_dir = tempfile::tempdir().unwrap();
    let log = Arc::new(LogStore::new(log_dir.path(), 1024 * 1024).unwrap());
    let notifier = Arc::new(RecordingNotifier::default());
    let mut watcher = KernelWatcher::new(
        &AppSettings::default(),
        ReleaseFeedClient::new().unwrap(),
        log,
        Arc::clone(&notifier) as Arc<dyn UpdateNotifier>,
    )
    .with_feed_url(format!("{}{}", server.uri(), FEED_PATH))
    // `false` exits non-zero, so the local version resolves to nothing.
    .with_kernel_query(KernelQuery::new("false", Vec::<String>::new()))
    .with_interval(Duration::from_secs(3600));

    let mut status = watcher.subscribe_status();
    watcher.start();

    assert_eq!(next_status(&mut status).await, "Checking kernel versions...");
    assert_eq!(
        next_status(&mut status).await,
        "Unable to determine versions (WSL or GitHub API failed)"
    );

    watcher.shutdown().await;
    assert!(notifier.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn feed_failure_skips_comparison() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let mut h = harness(
        &server,
        &AppSettings::default(),
        "5.15.90.1-microsoft-standard-WSL2",
    );
    h.watcher.start();

    assert_eq!(next_status(&mut h.status).await, "Checking kernel versions...");
    assert_eq!(
        next_status(&mut h.status).await,
        "Unable to determine versions (WSL or GitHub API failed)"
    );

    h.watcher.shutdown().await;
}

#[tokio::test]
async fn start_is_idempotent() {
    let server = MockServer::start().await;
    mock_feed(&server, "linux-msft-wsl-5.15.90.1").await;

    let mut h = harness(
        &server,
        &AppSettings::default(),
        "5.15.90.1-microsoft-standard-WSL2",
    );
    h.watcher.start();
    h.watcher.start();

    // One loop means one immediate check: exactly one "Checking" line shows
    // up before the hour-long tick.
    let mut checking_lines = 0;
    while let Ok(Ok(line)) =
        tokio::time::timeout(Duration::from_millis(1500), h.status.recv()).await
    {
        if line == "Checking kernel versions..." {
            checking_lines += 1;
        }
    }
    assert_eq!(checking_lines, 1);

    // Shutdown still awaits exactly one loop to completion.
    h.watcher.shutdown().await;
}

#[tokio::test]
async fn manual_check_runs_same_iteration_logic() {
    let server = MockServer::start().await;
    mock_feed(&server, "linux-msft-wsl-5.15.200.1").await;

    let h = harness(
        &server,
        &AppSettings::default(),
        "5.15.90.1-microsoft-standard-WSL2",
    );
    let mut status = h.watcher.subscribe_status();

    // Never started; the manual trigger alone drives a full iteration.
    h.watcher.check_now();

    assert_eq!(next_status(&mut status).await, "Checking kernel versions...");
    assert_eq!(
        next_status(&mut status).await,
        "Current: 5.15.90.1-microsoft-standard-WSL2 | Latest: linux-msft-wsl-5.15.200.1"
    );
    assert_eq!(
        next_status(&mut status).await,
        "Newer kernel detected. Sending notification."
    );
}

#[tokio::test]
async fn notifier_failure_becomes_error_status_and_loop_survives() {
    let server = MockServer::start().await;
    mock_feed(&server, "linux-msft-wsl-5.15.200.1").await;

    let log_dir = tempfile::tempdir().unwrap();
    let log = Arc::new(LogStore::new(log_dir.path(), 1024 * 1024).unwrap());
    let mut watcher = KernelWatcher::new(
        &AppSettings::default(),
        ReleaseFeedClient::new().unwrap(),
        log,
        Arc::new(FailingNotifier),
    )
    .with_feed_url(format!("{}{}", server.uri(), FEED_PATH))
    .with_kernel_query(KernelQuery::new("echo", ["5.15.90.1-microsoft-standard-WSL2"]))
    .with_interval(Duration::from_millis(300));

    let mut status = watcher.subscribe_status();
    watcher.start();

    assert_eq!(next_status(&mut status).await, "Checking kernel versions...");
    assert_eq!(
        next_status(&mut status).await,
        "Current: 5.15.90.1-microsoft-standard-WSL2 | Latest: linux-msft-wsl-5.15.200.1"
    );
    assert_eq!(
        next_status(&mut status).await,
        "Newer kernel detected. Sending notification."
    );
    assert_eq!(
        next_status(&mut status).await,
        "Error: notification error: toast delivery failed"
    );

    // The loop is still alive: the next scheduled tick checks again.
    assert_eq!(next_status(&mut status).await, "Checking kernel versions...");

    watcher.shutdown().await;
}

#[tokio::test]
async fn manual_check_is_skipped_while_a_check_is_in_flight() {
    let server = MockServer::start().await;
    mock_slow_feed(&server, "linux-msft-wsl-5.15.90.1", Duration::from_millis(500)).await;

    let mut h = harness(
        &server,
        &AppSettings::default(),
        "5.15.90.1-microsoft-standard-WSL2",
    );
    h.watcher.start();

    // The scheduled check holds the single-flight gate while the feed stalls.
    assert_eq!(next_status(&mut h.status).await, "Checking kernel versions...");
    h.watcher.check_now();

    assert_eq!(
        next_status(&mut h.status).await,
        "Check already in progress. Skipping manual check."
    );

    h.watcher.shutdown().await;
}

#[tokio::test]
async fn slow_iteration_does_not_trigger_catch_up_checks() {
    let server = MockServer::start().await;
    // The check outruns the interval: ticks fire (and are skipped) while the
    // feed stalls.
    mock_slow_feed(&server, "linux-msft-wsl-5.15.90.1", Duration::from_millis(700)).await;

    let log_dir = tempfile::tempdir().unwrap();
    let log = Arc::new(LogStore::new(log_dir.path(), 1024 * 1024).unwrap());
    let mut watcher = KernelWatcher::new(
        &AppSettings::default(),
        ReleaseFeedClient::new().unwrap(),
        log,
        Arc::new(RecordingNotifier::default()),
    )
    .with_feed_url(format!("{}{}", server.uri(), FEED_PATH))
    .with_kernel_query(KernelQuery::new("echo", ["5.15.90.1-microsoft-standard-WSL2"]))
    .with_interval(Duration::from_millis(300));

    let mut status = watcher.subscribe_status();
    watcher.start();

    assert_eq!(next_status(&mut status).await, "Checking kernel versions...");
    assert_eq!(
        next_status(&mut status).await,
        "Current: 5.15.90.1-microsoft-standard-WSL2 | Latest: linux-msft-wsl-5.15.90.1"
    );
    assert_eq!(next_status(&mut status).await, "Already up to date.");

    // Missed ticks were skipped, so no immediate back-to-back check follows
    // the slow iteration; the next one waits for the next scheduled tick.
    let immediate = tokio::time::timeout(Duration::from_millis(120), status.recv()).await;
    assert!(
        immediate.is_err(),
        "unexpected catch-up check right after a slow iteration: {immediate:?}"
    );

    watcher.shutdown().await;
}

#[tokio::test]
async fn disabled_notifications_suppress_the_notifier_but_not_the_status() {
    let server = MockServer::start().await;
    mock_feed(&server, "linux-msft-wsl-5.15.200.1").await;

    let settings = AppSettings {
        notifications_enabled: false,
        ..AppSettings::default()
    };
    let mut h = harness(&server, &settings, "5.15.90.1-microsoft-standard-WSL2");
    h.watcher.start();

    assert_eq!(next_status(&mut h.status).await, "Checking kernel versions...");
    assert_eq!(
        next_status(&mut h.status).await,
        "Current: 5.15.90.1-microsoft-standard-WSL2 | Latest: linux-msft-wsl-5.15.200.1"
    );
    assert_eq!(
        next_status(&mut h.status).await,
        "Newer kernel detected. Sending notification."
    );

    h.watcher.shutdown().await;
    assert!(h.notifier.calls.lock().unwrap().is_empty());
}
