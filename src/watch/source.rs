// src/watch/source.rs

//! The notification source: a pair of channels (events and errors) fed by
//! the OS watcher, plus the notify-backed [`WatchBackend`].

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::watch::event::{RawEvent, raw_events_from_notify};
use crate::watch::registry::WatchBackend;

/// Receiving half, drained by the coalescer.
#[derive(Debug)]
pub struct NotificationSource {
    pub(crate) events: mpsc::UnboundedReceiver<RawEvent>,
    pub(crate) errors: mpsc::UnboundedReceiver<String>,
}

/// Sending half. Cloned into the notify callback in production and held by
/// tests to script a session.
#[derive(Debug, Clone)]
pub struct SourceSender {
    events: mpsc::UnboundedSender<RawEvent>,
    errors: mpsc::UnboundedSender<String>,
}

impl NotificationSource {
    pub fn channel() -> (SourceSender, NotificationSource) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();
        (
            SourceSender {
                events: event_tx,
                errors: error_tx,
            },
            NotificationSource {
                events: event_rx,
                errors: error_rx,
            },
        )
    }

    /// Non-blocking check for a pending source error.
    pub fn try_error(&mut self) -> Option<String> {
        self.errors.try_recv().ok()
    }
}

impl SourceSender {
    /// Returns false once the receiving side is gone.
    pub fn send_event(&self, event: RawEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn send_error(&self, err: impl Into<String>) -> bool {
        self.errors.send(err.into()).is_ok()
    }
}

/// Per-directory, non-recursive watches on the platform's recommended
/// watcher. Dropping it stops all watching and closes the source channels.
pub struct NotifyBackend {
    inner: RecommendedWatcher,
}

impl fmt::Debug for NotifyBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyBackend").finish()
    }
}

impl NotifyBackend {
    /// Create the OS watcher and the channels it feeds.
    pub fn new() -> Result<(Self, NotificationSource)> {
        let (sender, source) = NotificationSource::channel();

        // Called synchronously on notify's own thread.
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for raw in raw_events_from_notify(event) {
                        if !sender.send_event(raw) {
                            // Session is over; nothing left to notify.
                            return;
                        }
                    }
                }
                Err(err) => {
                    let _ = sender.send_error(err.to_string());
                }
            },
            Config::default(),
        )
        .context("creating filesystem watcher")?;

        Ok((Self { inner: watcher }, source))
    }
}

impl WatchBackend for NotifyBackend {
    fn watch_dir(&mut self, path: &Path) -> Result<()> {
        self.inner
            .watch(path, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching {:?}", path))
    }

    fn unwatch_dir(&mut self, path: &Path) -> Result<()> {
        self.inner
            .unwatch(path)
            .with_context(|| format!("unwatching {:?}", path))
    }
}
