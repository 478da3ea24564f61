// src/watch/coalescer.rs

//! Debounce raw notifications into bursts.
//!
//! Editors and build tools emit many events per logical save. The coalescer
//! keeps absorbing events until the source has been quiet for one window,
//! then releases everything it collected as a single burst.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::watch::event::RawEvent;
use crate::watch::source::NotificationSource;

/// Default quiet interval.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// What the coalescer hands back to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Batch {
    /// A burst closed by a full quiet window.
    Events(Vec<RawEvent>),
    /// The notification source failed. Buffered events were discarded.
    SourceError(String),
    /// Cancellation fired. Buffered events were discarded.
    Cancelled,
    /// Both source channels closed with nothing buffered.
    Closed,
}

#[derive(Debug)]
pub struct Coalescer {
    window: Duration,
    pending: Vec<RawEvent>,
}

impl Coalescer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Vec::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait for the next burst.
    ///
    /// Priority on every wake-up is cancellation, then source errors, then
    /// new events, then the quiet-window timer; each event pushes the
    /// deadline out by one window.
    pub async fn next_batch(
        &mut self,
        source: &mut NotificationSource,
        cancel: &CancellationToken,
    ) -> Batch {
        let mut deadline: Option<Instant> = None;
        let mut errors_open = true;
        let mut events_open = true;

        loop {
            if !errors_open && !events_open && self.pending.is_empty() {
                return Batch::Closed;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    if !self.pending.is_empty() {
                        debug!(discarded = self.pending.len(), "cancelled; dropping partial burst");
                    }
                    self.pending.clear();
                    return Batch::Cancelled;
                }

                res = source.errors.recv(), if errors_open => match res {
                    Some(err) => {
                        if !self.pending.is_empty() {
                            debug!(discarded = self.pending.len(), "source error; dropping buffered events");
                        }
                        self.pending.clear();
                        return Batch::SourceError(err);
                    }
                    None => errors_open = false,
                },

                res = source.events.recv(), if events_open => match res {
                    Some(event) => {
                        trace!(?event, "buffered event");
                        self.pending.push(event);
                        deadline = Some(Instant::now() + self.window);
                    }
                    None => events_open = false,
                },

                _ = wait_until(deadline), if deadline.is_some() => {
                    let burst = std::mem::take(&mut self.pending);
                    debug!(events = burst.len(), "quiet window elapsed; releasing burst");
                    return Batch::Events(burst);
                }
            }
        }
    }
}

impl Default for Coalescer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

async fn wait_until(deadline: Option<Instant>) {
    if let Some(at) = deadline {
        sleep_until(at).await;
    }
}
