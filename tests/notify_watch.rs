// tests/notify_watch.rs
//
// End-to-end watch sessions over a real temporary directory and the
// platform's notify backend.

mod common;
use crate::common::{FakeCleanup, FakePushHandler, SharedBuffer, init_tracing, simple_descriptor};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use devloop::engine::{WatchParameters, watch};
use devloop::errors::DevloopError;
use devloop::watch::IgnoreList;

/// Poll until some push mentions `path` in its changed list.
async fn wait_for_change(handler: &FakePushHandler, path: &Path) {
    timeout(Duration::from_secs(10), async {
        loop {
            if handler
                .pushes()
                .iter()
                .any(|push| push.changed.iter().any(|p| p == path))
            {
                return;
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no push for {path:?}: {:?}", handler.pushes()));
}

fn session(root: &Path, handler: &FakePushHandler, out: &SharedBuffer) -> WatchParameters {
    WatchParameters::new(root, Arc::new(simple_descriptor("web")), Arc::new(handler.clone()))
        .with_ignore(IgnoreList::new(root, &["ignored"]).unwrap())
        .with_output(out.sink())
        .with_debounce(Duration::from_millis(50))
}

fn tempdir_root() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    fs::create_dir_all(root.join("ignored")).unwrap();
    (dir, root)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn file_changes_are_pushed_until_cancelled() {
    init_tracing();
    let (_dir, root) = tempdir_root();
    let handler = FakePushHandler::new();
    let out = SharedBuffer::new();
    let params = session(&root, &handler, &out);
    let cleanup = FakeCleanup::new();
    let cancel = CancellationToken::new();

    let task = {
        let cleanup = cleanup.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { watch(&params, cleanup, cancel).await })
    };
    // Give the watcher time to register.
    sleep(Duration::from_millis(200)).await;

    let file = root.join("main.rs");
    fs::write(&file, "fn main() {}").unwrap();
    fs::write(root.join("ignored/skip.txt"), "x").unwrap();
    wait_for_change(&handler, &file).await;

    cancel.cancel();
    let result = timeout(Duration::from_secs(10), task).await.unwrap().unwrap();

    assert!(result.is_ok(), "unexpected error: {result:?}");
    assert_eq!(cleanup.calls(), 1);
    for push in handler.pushes() {
        assert!(!push.full_sync);
        assert!(push.changed.iter().all(|p| !p.starts_with(root.join("ignored"))));
    }
    let output = out.contents();
    assert!(output.contains("File changes detected"));
    assert!(output.contains("cleanup done"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn new_directories_are_watched_without_restart() {
    init_tracing();
    let (_dir, root) = tempdir_root();
    let handler = FakePushHandler::new();
    let out = SharedBuffer::new();
    let params = session(&root, &handler, &out);
    let cancel = CancellationToken::new();

    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { watch(&params, FakeCleanup::new(), cancel).await })
    };
    sleep(Duration::from_millis(200)).await;

    let sub = root.join("pkg");
    fs::create_dir(&sub).unwrap();
    wait_for_change(&handler, &sub).await;

    let nested = sub.join("lib.rs");
    fs::write(&nested, "pub fn lib() {}").unwrap();
    wait_for_change(&handler, &nested).await;

    cancel.cancel();
    let result = timeout(Duration::from_secs(10), task).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_push_does_not_end_the_session() {
    init_tracing();
    let (_dir, root) = tempdir_root();
    let handler = FakePushHandler::fail_first(1, "transient");
    let out = SharedBuffer::new();
    let params = session(&root, &handler, &out);
    let cancel = CancellationToken::new();

    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { watch(&params, FakeCleanup::new(), cancel).await })
    };
    sleep(Duration::from_millis(200)).await;

    let first = root.join("a.txt");
    fs::write(&first, "a").unwrap();
    wait_for_change(&handler, &first).await;

    let second = root.join("b.txt");
    fs::write(&second, "b").unwrap();
    wait_for_change(&handler, &second).await;

    cancel.cancel();
    let result = timeout(Duration::from_secs(10), task).await.unwrap().unwrap();
    assert!(result.is_ok());
    assert!(out.contents().contains("Failed to push changes: push failed: transient"));
}

#[tokio::test]
async fn missing_root_is_a_setup_error() {
    let (_dir, root) = tempdir_root();
    let missing = root.join("does-not-exist");
    let handler = FakePushHandler::new();
    let out = SharedBuffer::new();
    let params = session(&missing, &handler, &out);
    let cleanup = FakeCleanup::new();

    let result = watch(&params, cleanup.clone(), CancellationToken::new()).await;

    assert!(matches!(result, Err(DevloopError::WatchSetup { .. })));
    assert_eq!(cleanup.calls(), 0);
}
