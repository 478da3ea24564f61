// src/push/mod.rs

//! The push capability: bringing the target environment in line with the
//! local tree.
//!
//! The engine only knows the [`PushHandler`] trait. [`SyncHandler`] is the
//! implementation the binary uses: it mirrors files into a sync directory,
//! keeps a content [`index::FileIndex`], and runs descriptor commands through
//! a [`crate::exec::CommandExecutor`].

pub mod index;
pub mod sync;

use std::path::PathBuf;

use crate::engine::WatchParameters;
use crate::errors::Result;
use crate::types::{BoxFuture, RunMode};
use crate::watch::ChangeSet;

pub use index::{FileIndex, FileIndexStore, IndexStore, MemoryIndexStore};
pub use sync::{SyncHandler, SyncTarget};

/// What a single push should apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushParameters {
    /// Local root the paths belong to.
    pub path: PathBuf,
    pub changed: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub run_mode: RunMode,
    /// Ignore `changed`/`deleted` and compare the whole tree with the index
    /// instead. Set for the one-shot start.
    pub full_sync: bool,
}

impl PushParameters {
    /// Incremental push of one classified change set.
    pub fn from_changes(changes: &ChangeSet, params: &WatchParameters) -> Self {
        Self {
            path: params.root.clone(),
            changed: changes.changed().to_vec(),
            deleted: changes.deleted().to_vec(),
            run_mode: params.run_mode,
            full_sync: false,
        }
    }

    /// Full push of everything under the root.
    pub fn full(params: &WatchParameters) -> Self {
        Self {
            path: params.root.clone(),
            changed: Vec::new(),
            deleted: Vec::new(),
            run_mode: params.run_mode,
            full_sync: true,
        }
    }
}

/// Synchronises remote state with the local changes described by a
/// [`PushParameters`], then (re)starts the configured commands.
pub trait PushHandler: Send + Sync {
    fn regenerate_and_push<'a>(
        &'a self,
        push: PushParameters,
        params: &'a WatchParameters,
    ) -> BoxFuture<'a, Result<()>>;
}
