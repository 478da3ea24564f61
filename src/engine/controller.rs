// src/engine/controller.rs

//! Lifecycle controller: the watch → classify → dispatch loop.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::cleanup::CleanupRunner;
use crate::engine::dispatcher::{Dispatcher, PushDispatcher};
use crate::engine::state::{SessionState, Signal};
use crate::engine::WatchParameters;
use crate::errors::{DevloopError, Result};
use crate::fs::RealFileSystem;
use crate::watch::{
    Batch, Classifier, Coalescer, EventClassifier, NotificationSource, NotifyBackend, PathSet,
    WatchBackend, WatchedPathRegistry,
};

/// Drives one watch session.
///
/// Generic over the three pluggable steps so tests can substitute any of
/// them. Owns the session state; the registry and the notification source
/// are owned by the session itself for its whole lifetime.
pub struct LifecycleController<C, D, R> {
    classifier: C,
    dispatcher: D,
    cleanup: R,
    state: SessionState,
}

impl<C, D, R> std::fmt::Debug for LifecycleController<C, D, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<C, D, R> LifecycleController<C, D, R>
where
    C: Classifier,
    D: Dispatcher,
    R: CleanupRunner,
{
    pub fn new(classifier: C, dispatcher: D, cleanup: R) -> Self {
        Self {
            classifier,
            dispatcher,
            cleanup,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn signal(&mut self, signal: Signal) {
        let next = self.state.next(signal);
        if next != self.state {
            debug!(from = ?self.state, to = ?next, ?signal, "session state change");
        }
        self.state = next;
    }

    /// Watch `params.root` on the platform's notify backend until `cancel`
    /// fires or the watcher fails.
    pub async fn watch(&mut self, params: &WatchParameters, cancel: CancellationToken) -> Result<()> {
        let (backend, source) = match NotifyBackend::new() {
            Ok(pair) => pair,
            Err(err) => {
                self.signal(Signal::WatchRequested);
                self.signal(Signal::SetupFailed);
                return Err(DevloopError::WatchSetup {
                    path: params.root.clone(),
                    reason: format!("{err:#}"),
                });
            }
        };

        let mut registry =
            WatchedPathRegistry::new(backend, Arc::new(RealFileSystem), params.ignore.clone());
        self.watch_with(&mut registry, source, params, cancel).await
    }

    /// Same as [`Self::watch`] over a caller-supplied registry and source.
    ///
    /// Setup failure returns immediately without cleanup. Otherwise the
    /// cleanup runner is invoked exactly once before returning.
    pub async fn watch_with<B: WatchBackend>(
        &mut self,
        registry: &mut WatchedPathRegistry<B>,
        source: NotificationSource,
        params: &WatchParameters,
        cancel: CancellationToken,
    ) -> Result<()> {
        self.signal(Signal::WatchRequested);

        if let Err(err) = registry.add_tree(&params.root) {
            error!(root = ?params.root, error = %err, "cannot watch root");
            self.signal(Signal::SetupFailed);
            return Err(err);
        }
        info!(root = ?params.root, directories = registry.len(), "watching for changes");
        self.signal(Signal::Ready);

        let outcome = self.run_loop(source, registry, params, &cancel).await;

        if let Err(err) = self.cleanup.cleanup(&params.descriptor, &params.out).await {
            warn!(error = %err, "cleanup failed");
        }
        self.signal(Signal::CleanupFinished);
        info!(ok = outcome.is_ok(), "watch session finished");
        outcome
    }

    /// Consume bursts until cancellation (`Ok`) or a source failure (`Err`).
    /// Leaves the state in `CleaningUp`.
    async fn run_loop(
        &mut self,
        mut source: NotificationSource,
        paths: &mut dyn PathSet,
        params: &WatchParameters,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut coalescer = Coalescer::new(params.debounce);

        loop {
            if cancel.is_cancelled() {
                info!("cancellation requested");
                self.signal(Signal::Cancelled);
                return Ok(());
            }

            let events = match coalescer.next_batch(&mut source, cancel).await {
                Batch::Events(events) => events,
                Batch::Cancelled => {
                    info!("cancellation requested");
                    self.signal(Signal::Cancelled);
                    return Ok(());
                }
                Batch::SourceError(err) => {
                    error!(error = %err, "file watcher reported an error");
                    self.signal(Signal::SourceFailed);
                    return Err(DevloopError::WatcherFailed(err));
                }
                Batch::Closed => {
                    error!("file watcher channel closed");
                    self.signal(Signal::SourceFailed);
                    return Err(DevloopError::WatcherFailed(
                        "notification source closed".to_string(),
                    ));
                }
            };

            let changes = self.classifier.classify(events, &params.ignore, paths);
            if changes.is_empty() {
                debug!("burst contained only ignored paths");
                continue;
            }

            // A source error that arrived during classification still wins
            // over the pending change set.
            if let Some(err) = source.try_error() {
                error!(error = %err, "file watcher reported an error");
                self.signal(Signal::SourceFailed);
                return Err(DevloopError::WatcherFailed(err));
            }

            self.signal(Signal::ChangesReady);
            if let Err(err) = self.dispatcher.dispatch(&changes, params).await {
                warn!(error = %err, "push failed; continuing to watch");
                params.out.line(format!("Failed to push changes: {err}"));
            }
            self.signal(Signal::DispatchFinished);
        }
    }
}

/// Run a watch session with the production classifier and dispatcher.
///
/// Returns `Ok(())` once `cancel` fires and cleanup has run. Setup failures
/// and notification-source failures are returned as errors; only the latter
/// run `cleanup` first.
pub async fn watch<R: CleanupRunner>(
    params: &WatchParameters,
    cleanup: R,
    cancel: CancellationToken,
) -> Result<()> {
    let mut controller = LifecycleController::new(EventClassifier, PushDispatcher, cleanup);
    controller.watch(params, cancel).await
}
