// src/watch/registry.rs

//! The set of directories currently under observation.
//!
//! Every non-ignored directory below the root gets its own non-recursive
//! watch. The set grows when the classifier reports a newly created directory
//! and shrinks when a path is removed or renamed away, so a long session
//! follows the tree without restarting.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result as AnyResult;
use tracing::{debug, warn};

use crate::errors::{DevloopError, Result};
use crate::fs::FileSystem;
use crate::watch::ignore::IgnoreList;
use crate::watch::path_utils::normalize;

/// Something that can attach/detach a watch on a single directory.
///
/// Production uses the notify watcher from [`crate::watch::source`]; tests
/// use a recorder.
pub trait WatchBackend: Send {
    fn watch_dir(&mut self, path: &Path) -> AnyResult<()>;
    fn unwatch_dir(&mut self, path: &Path) -> AnyResult<()>;
}

/// Mutation surface the classifier is allowed to touch.
pub trait PathSet: Send {
    /// Revoke the handle for exactly `path`. No-op if there is none.
    fn remove(&mut self, path: &Path);

    /// Start watching `path` and its subdirectories if it is a new,
    /// non-ignored directory. Never fails the session.
    fn rediscover(&mut self, path: &Path);
}

pub struct WatchedPathRegistry<B: WatchBackend> {
    backend: B,
    fs: Arc<dyn FileSystem>,
    ignore: IgnoreList,
    handles: BTreeSet<PathBuf>,
}

impl<B: WatchBackend> std::fmt::Debug for WatchedPathRegistry<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchedPathRegistry")
            .field("handles", &self.handles)
            .finish_non_exhaustive()
    }
}

impl<B: WatchBackend> WatchedPathRegistry<B> {
    pub fn new(backend: B, fs: Arc<dyn FileSystem>, ignore: IgnoreList) -> Self {
        Self {
            backend,
            fs,
            ignore,
            handles: BTreeSet::new(),
        }
    }

    /// Register `root` and every non-ignored directory below it.
    ///
    /// Failing to watch `root` itself is an error; a subdirectory that cannot
    /// be watched or listed is logged and skipped along with its subtree.
    /// Returns the number of handles added.
    pub fn add_tree(&mut self, root: &Path) -> Result<usize> {
        let root = normalize(root);

        if self.ignore.matches(&root) {
            debug!(path = ?root, "add_tree: root is ignored; nothing to watch");
            return Ok(0);
        }
        if !self.fs.is_dir(&root) {
            return Err(DevloopError::WatchSetup {
                path: root,
                reason: "not a directory".to_string(),
            });
        }

        let mut added = 0;
        if !self.handles.contains(&root) {
            self.backend
                .watch_dir(&root)
                .map_err(|err| DevloopError::WatchSetup {
                    path: root.clone(),
                    reason: format!("{err:#}"),
                })?;
            self.handles.insert(root.clone());
            added += 1;
        }

        let mut stack = vec![root];
        while let Some(dir) = stack.pop() {
            let entries = match self.fs.read_dir(&dir) {
                Ok(e) => e,
                Err(err) => {
                    warn!(path = ?dir, error = %err, "cannot list directory; skipping subtree");
                    continue;
                }
            };

            for entry in entries {
                if !self.fs.is_dir(&entry) || self.ignore.matches(&entry) {
                    continue;
                }
                if !self.handles.contains(&entry) {
                    if let Err(err) = self.backend.watch_dir(&entry) {
                        warn!(path = ?entry, error = %err, "cannot watch directory; skipping subtree");
                        continue;
                    }
                    self.handles.insert(entry.clone());
                    added += 1;
                }
                stack.push(entry);
            }
        }

        debug!(added, total = self.handles.len(), "add_tree finished");
        Ok(added)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.handles.contains(&normalize(path))
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Watched directories in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.handles.iter().map(PathBuf::as_path)
    }

    pub fn ignore(&self) -> &IgnoreList {
        &self.ignore
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: WatchBackend> PathSet for WatchedPathRegistry<B> {
    fn remove(&mut self, path: &Path) {
        let path = normalize(path);
        if !self.handles.remove(&path) {
            return;
        }
        // The OS usually drops the watch itself once the inode is gone.
        if let Err(err) = self.backend.unwatch_dir(&path) {
            debug!(path = ?path, error = %err, "unwatch failed; handle already gone");
        }
        debug!(path = ?path, "stopped watching removed path");
    }

    fn rediscover(&mut self, path: &Path) {
        let path = normalize(path);
        if self.handles.contains(&path) || !self.fs.is_dir(&path) || self.ignore.matches(&path) {
            return;
        }
        match self.add_tree(&path) {
            Ok(added) => debug!(path = ?path, added, "watching newly created directory"),
            Err(err) => warn!(path = ?path, error = %err, "cannot watch new directory; skipping"),
        }
    }
}
