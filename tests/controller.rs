// tests/controller.rs

mod common;
use crate::common::{
    FakeBackend, FakeCleanup, FakeDispatcher, FakePushHandler, SharedBuffer, ignore,
    init_tracing, p, params_with, root, sample_tree, simple_descriptor, with_timeout,
};

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use devloop::engine::{LifecycleController, SessionState, WatchParameters};
use devloop::errors::DevloopError;
use devloop::fs::mock::MockFileSystem;
use devloop::watch::{
    ChangeSet, EventClassifier, NotificationSource, RawEvent, SourceSender, WatchedPathRegistry,
};

struct Harness {
    fs: MockFileSystem,
    backend: FakeBackend,
    out: SharedBuffer,
    dispatcher: FakeDispatcher,
    cleanup: FakeCleanup,
    params: WatchParameters,
}

impl Harness {
    fn new(dispatcher: FakeDispatcher, cleanup: FakeCleanup) -> Self {
        let out = SharedBuffer::new();
        let params = params_with(
            &root(),
            simple_descriptor("web"),
            Arc::new(FakePushHandler::new()),
            &out,
        )
        .with_ignore(ignore(&["node_modules"]))
        .with_debounce(Duration::from_millis(50));
        Self {
            fs: sample_tree(),
            backend: FakeBackend::new(),
            out,
            dispatcher,
            cleanup,
            params,
        }
    }

    fn registry(&self) -> WatchedPathRegistry<FakeBackend> {
        WatchedPathRegistry::new(
            self.backend.clone(),
            Arc::new(self.fs.clone()),
            self.params.ignore.clone(),
        )
    }

    /// Run a session while `script` drives the source and the token.
    async fn run<F, Fut>(
        &self,
        script: F,
    ) -> (Result<(), DevloopError>, SessionState)
    where
        F: FnOnce(SourceSender, CancellationToken) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (tx, source) = NotificationSource::channel();
        let cancel = CancellationToken::new();
        let driver = tokio::spawn(script(tx, cancel.clone()));

        let mut registry = self.registry();
        let mut controller = LifecycleController::new(
            EventClassifier,
            self.dispatcher.clone(),
            self.cleanup.clone(),
        );
        let result = with_timeout(controller.watch_with(
            &mut registry,
            source,
            &self.params,
            cancel,
        ))
        .await;
        driver.abort();
        (result, controller.state())
    }
}

fn changes(changed: &[&str], deleted: &[&str]) -> ChangeSet {
    let mut set = ChangeSet::new();
    for path in changed {
        set.record_changed(p(path));
    }
    for path in deleted {
        set.record_deleted(p(path));
    }
    set
}

#[tokio::test(start_paused = true)]
async fn create_and_write_dispatch_once_then_cancel_returns_ok() {
    init_tracing();
    let h = Harness::new(FakeDispatcher::new(), FakeCleanup::new());

    let (result, state) = h
        .run(|tx, cancel| async move {
            tx.send_event(RawEvent::create(p("file1")));
            tx.send_event(RawEvent::write(p("file2")));
            sleep(Duration::from_millis(500)).await;
            cancel.cancel();
            sleep(Duration::from_secs(60)).await;
            drop(tx);
        })
        .await;

    assert!(result.is_ok(), "unexpected error: {result:?}");
    assert_eq!(state, SessionState::Terminated);
    assert_eq!(h.dispatcher.dispatched(), vec![changes(&["file1", "file2"], &[])]);
    assert_eq!(h.cleanup.calls(), 1);

    let output = h.out.contents();
    assert!(output.contains("changedFiles"));
    assert!(output.contains("cleanup done"));
}

#[tokio::test(start_paused = true)]
async fn source_error_returns_error_after_cleanup_only() {
    init_tracing();
    let h = Harness::new(FakeDispatcher::new(), FakeCleanup::new());

    let (result, state) = h
        .run(|tx, _cancel| async move {
            tx.send_error("error1");
            sleep(Duration::from_secs(60)).await;
            drop(tx);
        })
        .await;

    match result {
        Err(DevloopError::WatcherFailed(msg)) => assert_eq!(msg, "error1"),
        other => panic!("expected WatcherFailed, got {other:?}"),
    }
    assert_eq!(state, SessionState::Terminated);
    assert_eq!(h.cleanup.calls(), 1);
    assert!(h.dispatcher.dispatched().is_empty());

    assert_eq!(h.out.lines(), vec!["cleanup done"]);
}

#[tokio::test(start_paused = true)]
async fn source_error_discards_undispatched_changes() {
    let h = Harness::new(FakeDispatcher::new(), FakeCleanup::new());

    let (result, _) = h
        .run(|tx, _cancel| async move {
            tx.send_event(RawEvent::write(p("src/main.rs")));
            tx.send_error("inotify queue overflow");
            sleep(Duration::from_secs(60)).await;
            drop(tx);
        })
        .await;

    assert!(matches!(result, Err(DevloopError::WatcherFailed(_))));
    assert!(h.dispatcher.dispatched().is_empty());
    assert_eq!(h.cleanup.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn dispatch_failure_keeps_watching() {
    init_tracing();
    let h = Harness::new(FakeDispatcher::fail_first(1), FakeCleanup::new());

    let (result, _) = h
        .run(|tx, cancel| async move {
            tx.send_event(RawEvent::write(p("src/main.rs")));
            sleep(Duration::from_millis(300)).await;
            tx.send_event(RawEvent::write(p("README.md")));
            sleep(Duration::from_millis(300)).await;
            cancel.cancel();
            sleep(Duration::from_secs(60)).await;
            drop(tx);
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(
        h.dispatcher.dispatched(),
        vec![changes(&["src/main.rs"], &[]), changes(&["README.md"], &[])]
    );
    assert!(h.out.contents().contains("Failed to push changes"));
    assert_eq!(h.cleanup.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn ignored_only_burst_is_not_dispatched() {
    let h = Harness::new(FakeDispatcher::new(), FakeCleanup::new());

    let (result, _) = h
        .run(|tx, cancel| async move {
            tx.send_event(RawEvent::write(p("node_modules/dep/index.js")));
            tx.send_event(RawEvent::write(p(".devloop/file-index")));
            sleep(Duration::from_millis(300)).await;
            cancel.cancel();
            sleep(Duration::from_secs(60)).await;
            drop(tx);
        })
        .await;

    assert!(result.is_ok());
    assert!(h.dispatcher.dispatched().is_empty());
}

#[tokio::test(start_paused = true)]
async fn deleted_directory_leaves_registry_before_dispatch() {
    let h = Harness::new(FakeDispatcher::new(), FakeCleanup::new());
    let fs = h.fs.clone();

    let (result, _) = h
        .run(move |tx, cancel| async move {
            fs.remove(p("src/nested"));
            tx.send_event(RawEvent::remove(p("src/nested")));
            sleep(Duration::from_millis(300)).await;
            cancel.cancel();
            sleep(Duration::from_secs(60)).await;
            drop(tx);
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(h.dispatcher.dispatched(), vec![changes(&[], &["src/nested"])]);
    assert!(h.backend.unwatched().contains(&p("src/nested")));
}

#[tokio::test(start_paused = true)]
async fn unwatchable_root_fails_without_cleanup() {
    let mut h = Harness::new(FakeDispatcher::new(), FakeCleanup::new());
    h.backend = FakeBackend::new().fail_on(root());

    let (result, state) = h
        .run(|tx, _cancel| async move {
            sleep(Duration::from_secs(60)).await;
            drop(tx);
        })
        .await;

    assert!(matches!(result, Err(DevloopError::WatchSetup { .. })));
    assert_eq!(state, SessionState::Terminated);
    assert_eq!(h.cleanup.calls(), 0);
    assert!(h.out.contents().is_empty());
}

#[tokio::test(start_paused = true)]
async fn closed_source_is_fatal() {
    let h = Harness::new(FakeDispatcher::new(), FakeCleanup::new());

    let (result, _) = h.run(|tx, _cancel| async move { drop(tx) }).await;

    assert!(matches!(result, Err(DevloopError::WatcherFailed(_))));
    assert_eq!(h.cleanup.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn cleanup_failure_is_not_escalated() {
    let h = Harness::new(FakeDispatcher::new(), FakeCleanup::failing());

    let (result, state) = h
        .run(|tx, cancel| async move {
            cancel.cancel();
            sleep(Duration::from_secs(60)).await;
            drop(tx);
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(state, SessionState::Terminated);
    assert_eq!(h.cleanup.calls(), 1);
}

#[test]
fn unused_controller_starts_idle() {
    let controller =
        LifecycleController::new(EventClassifier, FakeDispatcher::new(), FakeCleanup::new());
    assert_eq!(controller.state(), SessionState::Idle);
}
