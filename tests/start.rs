// tests/start.rs

mod common;
use crate::common::{
    CommandBuilder, ConfigFileBuilder, FakeCleanup, FakePushHandler, SharedBuffer, init_tracing,
    params_with, root, simple_descriptor, with_timeout,
};

use std::fs;
use std::sync::Arc;

use devloop::config::TargetSection;
use devloop::engine::{start, start_with_handler};
use devloop::errors::DevloopError;
use devloop::push::SyncTarget;
use devloop::types::{IndexStorageMode, RunMode};
use devloop::watch::IgnoreList;

#[tokio::test]
async fn failing_handler_error_is_returned_verbatim() {
    init_tracing();
    let handler = FakePushHandler::always_fail("cluster unreachable");
    let out = SharedBuffer::new();
    let params = params_with(&root(), simple_descriptor("web"), Arc::new(handler.clone()), &out);
    let cleanup = FakeCleanup::new();

    let err = start_with_handler(&params).await.unwrap_err();

    match err {
        DevloopError::PushFailed(msg) => assert_eq!(msg, "cluster unreachable"),
        other => panic!("expected PushFailed, got {other:?}"),
    }
    assert_eq!(handler.pushes().len(), 1);
    assert_eq!(cleanup.calls(), 0);
    assert!(!out.contents().contains("cleanup"));
    assert!(!out.contents().contains("Push complete"));
}

#[tokio::test]
async fn start_requests_exactly_one_full_push() {
    let handler = FakePushHandler::new();
    let out = SharedBuffer::new();
    let params = params_with(&root(), simple_descriptor("web"), Arc::new(handler.clone()), &out)
        .with_run_mode(RunMode::Debug);

    start_with_handler(&params).await.unwrap();

    let pushes = handler.pushes();
    assert_eq!(pushes.len(), 1);
    assert!(pushes[0].full_sync);
    assert_eq!(pushes[0].path, root());
    assert_eq!(pushes[0].run_mode, RunMode::Debug);
    assert!(out.contents().contains("Push complete"));
}

#[tokio::test]
async fn start_syncs_a_real_tree_and_runs_commands() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
    fs::create_dir_all(root.join("target/debug")).unwrap();
    fs::write(root.join("target/debug/app"), "binary").unwrap();

    let workdir = root.to_string_lossy().into_owned();
    let descriptor = ConfigFileBuilder::new("web")
        .with_command(
            CommandBuilder::build_cmd("mark", "echo \"$GREETING\" > built.txt")
                .workdir(&workdir)
                .env("GREETING", "hello")
                .build(),
        )
        .with_command(CommandBuilder::run("serve", "true").build())
        .descriptor();
    let target = SyncTarget::from_section(&TargetSection::default(), &root, IndexStorageMode::File);
    let ignore = IgnoreList::new(&root, &["target"]).unwrap();

    with_timeout(start(
        Arc::new(descriptor),
        target,
        ignore,
        root.clone(),
        RunMode::Run,
    ))
    .await
    .unwrap();

    let synced = root.join(".devloop/remote/src/main.rs");
    assert_eq!(fs::read_to_string(synced).unwrap(), "fn main() {}");
    assert!(!root.join(".devloop/remote/target").exists());
    assert!(root.join(".devloop/file-index").is_file());
    assert_eq!(fs::read_to_string(root.join("built.txt")).unwrap().trim(), "hello");
}

#[tokio::test]
async fn start_reports_failing_build_command() {
    let dir = tempfile::tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    fs::write(root.join("app.txt"), "x").unwrap();

    let descriptor = ConfigFileBuilder::new("web")
        .with_command(CommandBuilder::build_cmd("broken", "exit 3").build())
        .with_command(CommandBuilder::run("serve", "true").build())
        .descriptor();
    let target =
        SyncTarget::from_section(&TargetSection::default(), &root, IndexStorageMode::Memory);

    let err = with_timeout(start(
        Arc::new(descriptor),
        target,
        IgnoreList::empty(&root),
        root.clone(),
        RunMode::Run,
    ))
    .await
    .unwrap_err();

    match err {
        DevloopError::CommandFailed { id, reason } => {
            assert_eq!(id, "broken");
            assert_eq!(reason, "exit code 3");
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}
