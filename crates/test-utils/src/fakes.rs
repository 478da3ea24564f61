#![allow(dead_code)]

//! Recording fakes for every capability seam the engine exposes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use devloop::config::{CommandConfig, Descriptor};
use devloop::engine::{CleanupRunner, Dispatcher, WatchParameters};
use devloop::errors::{DevloopError, Result};
use devloop::exec::CommandExecutor;
use devloop::push::{PushHandler, PushParameters};
use devloop::types::{BoxFuture, OutputSink};
use devloop::watch::{ChangeSet, WatchBackend};

/// A fake executor that:
/// - records `run:<id>`, `restart:<id>` and `stop` calls in order
/// - fails `run`/`restart` for the ids registered with `fail_on`.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    calls: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<BTreeSet<String>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(self, id: &str) -> Self {
        self.failing.lock().unwrap().insert(id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String, id: &str) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(id) {
            return Err(DevloopError::CommandFailed {
                id: id.to_string(),
                reason: "exit code 1".to_string(),
            });
        }
        Ok(())
    }
}

impl CommandExecutor for RecordingExecutor {
    fn run<'a>(
        &'a self,
        command: &'a CommandConfig,
        _out: &'a OutputSink,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.record(format!("run:{}", command.id), &command.id) })
    }

    fn restart<'a>(
        &'a self,
        command: &'a CommandConfig,
        _out: &'a OutputSink,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.record(format!("restart:{}", command.id), &command.id) })
    }

    fn stop(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push("stop".to_string());
            Ok(())
        })
    }
}

/// Push handler that records every call and fails the first `failures`
/// of them (or all of them with `always_fail`).
#[derive(Debug, Clone, Default)]
pub struct FakePushHandler {
    pushes: Arc<Mutex<Vec<PushParameters>>>,
    failures: Arc<AtomicUsize>,
    error: Option<String>,
}

impl FakePushHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn always_fail(message: &str) -> Self {
        Self {
            failures: Arc::new(AtomicUsize::new(usize::MAX)),
            error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn fail_first(n: usize, message: &str) -> Self {
        Self {
            failures: Arc::new(AtomicUsize::new(n)),
            error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn pushes(&self) -> Vec<PushParameters> {
        self.pushes.lock().unwrap().clone()
    }
}

impl PushHandler for FakePushHandler {
    fn regenerate_and_push<'a>(
        &'a self,
        push: PushParameters,
        _params: &'a WatchParameters,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.pushes.lock().unwrap().push(push);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                if remaining != usize::MAX {
                    self.failures.fetch_sub(1, Ordering::SeqCst);
                }
                let msg = self.error.clone().unwrap_or_else(|| "push failed".to_string());
                return Err(DevloopError::PushFailed(msg));
            }
            Ok(())
        })
    }
}

/// Watch backend that records watched directories instead of touching the OS.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    watched: Arc<Mutex<Vec<PathBuf>>>,
    unwatched: Arc<Mutex<Vec<PathBuf>>>,
    failing: Arc<Mutex<BTreeSet<PathBuf>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `watch_dir` fail for exactly `path`.
    pub fn fail_on(self, path: impl AsRef<Path>) -> Self {
        self.failing
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf());
        self
    }

    pub fn watched(&self) -> Vec<PathBuf> {
        self.watched.lock().unwrap().clone()
    }

    pub fn unwatched(&self) -> Vec<PathBuf> {
        self.unwatched.lock().unwrap().clone()
    }
}

impl WatchBackend for FakeBackend {
    fn watch_dir(&mut self, path: &Path) -> anyhow::Result<()> {
        if self.failing.lock().unwrap().contains(path) {
            anyhow::bail!("permission denied: {}", path.display());
        }
        self.watched.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn unwatch_dir(&mut self, path: &Path) -> anyhow::Result<()> {
        self.unwatched.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// Dispatcher that writes the change set to the sink and records it.
#[derive(Debug, Clone, Default)]
pub struct FakeDispatcher {
    dispatched: Arc<Mutex<Vec<ChangeSet>>>,
    failures: Arc<AtomicUsize>,
}

impl FakeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_first(n: usize) -> Self {
        Self {
            failures: Arc::new(AtomicUsize::new(n)),
            ..Self::default()
        }
    }

    pub fn dispatched(&self) -> Vec<ChangeSet> {
        self.dispatched.lock().unwrap().clone()
    }
}

impl Dispatcher for FakeDispatcher {
    fn dispatch<'a>(
        &'a mut self,
        changes: &'a ChangeSet,
        params: &'a WatchParameters,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            params.out.line(format!(
                "changedFiles {:?} deletedPaths {:?}",
                changes.changed(),
                changes.deleted()
            ));
            self.dispatched.lock().unwrap().push(changes.clone());
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(DevloopError::PushFailed("dispatch failed".to_string()));
            }
            Ok(())
        })
    }
}

/// Cleanup runner that counts invocations.
#[derive(Debug, Clone, Default)]
pub struct FakeCleanup {
    calls: Arc<AtomicUsize>,
    fail: bool,
}

impl FakeCleanup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CleanupRunner for FakeCleanup {
    fn cleanup<'a>(
        &'a mut self,
        _descriptor: &'a Descriptor,
        out: &'a OutputSink,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            out.line("cleanup done");
            if self.fail {
                return Err(DevloopError::CommandFailed {
                    id: "stop".to_string(),
                    reason: "exit code 1".to_string(),
                });
            }
            Ok(())
        })
    }
}
