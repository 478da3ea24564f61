// src/engine/mod.rs

//! Orchestration engine for devloop.
//!
//! This module ties together:
//! - the session state machine ([`state`])
//! - the dispatcher that hands change sets to the push handler
//! - the cleanup runner invoked when a session ends
//! - the lifecycle controller that drives watch → classify → dispatch
//!
//! The two public entry points are [`start`] (one-shot push) and [`watch`]
//! (continuous loop until cancelled).

pub mod cleanup;
pub mod controller;
pub mod dispatcher;
pub mod start;
pub mod state;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Descriptor;
use crate::push::PushHandler;
use crate::types::{OutputSink, RunMode};
use crate::watch::path_utils::{absolutize, normalize};
use crate::watch::{DEFAULT_DEBOUNCE, IgnoreList};

pub use cleanup::{CleanupRunner, PreStopCleanup};
pub use controller::{LifecycleController, watch};
pub use dispatcher::{Dispatcher, PushDispatcher};
pub use start::{start, start_with_handler};
pub use state::{SessionState, Signal};

/// Configuration of one watch session. Built once, read-only afterwards.
#[derive(Clone)]
pub struct WatchParameters {
    /// Absolute, normalised root of the watched tree.
    pub root: PathBuf,
    pub ignore: IgnoreList,
    pub descriptor: Arc<Descriptor>,
    /// Location of the descriptor file, if it lives under the root. A change
    /// to it surfaces a restart notice.
    pub descriptor_path: Option<PathBuf>,
    pub run_mode: RunMode,
    pub out: OutputSink,
    pub handler: Arc<dyn PushHandler>,
    pub debounce: Duration,
}

impl WatchParameters {
    pub fn new(
        root: impl AsRef<Path>,
        descriptor: Arc<Descriptor>,
        handler: Arc<dyn PushHandler>,
    ) -> Self {
        let root = normalize(root.as_ref());
        Self {
            ignore: IgnoreList::empty(&root),
            root,
            descriptor,
            descriptor_path: None,
            run_mode: RunMode::Run,
            out: OutputSink::stdout(),
            handler,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_ignore(mut self, ignore: IgnoreList) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn with_run_mode(mut self, mode: RunMode) -> Self {
        self.run_mode = mode;
        self
    }

    pub fn with_output(mut self, out: OutputSink) -> Self {
        self.out = out;
        self
    }

    pub fn with_descriptor_path(mut self, path: impl AsRef<Path>) -> Self {
        self.descriptor_path = Some(absolutize(&self.root, path.as_ref()));
        self
    }

    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }
}

impl std::fmt::Debug for WatchParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchParameters")
            .field("root", &self.root)
            .field("ignore", &self.ignore)
            .field("component", &self.descriptor.name())
            .field("descriptor_path", &self.descriptor_path)
            .field("run_mode", &self.run_mode)
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}
