// src/push/sync.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::config::{ConfigFile, Descriptor, TargetSection, parse_str};
use crate::engine::WatchParameters;
use crate::errors::{DevloopError, Result};
use crate::exec::CommandExecutor;
use crate::fs::FileSystem;
use crate::push::index::{
    FileIndex, FileIndexStore, IndexStore, MemoryIndexStore, compute_file_hash,
};
use crate::push::{PushHandler, PushParameters};
use crate::types::{BoxFuture, IndexStorageMode, OutputSink, RunMode};
use crate::watch::IgnoreList;
use crate::watch::path_utils::{absolutize, normalize, relative_str};

/// Where pushed files land and how commands reach the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    /// Absolute destination directory mirroring the local root.
    pub sync_dir: PathBuf,
    /// Exec prefix handed to the command executor.
    pub exec: Vec<String>,
    pub index: IndexStorageMode,
}

impl SyncTarget {
    pub fn from_section(section: &TargetSection, root: &Path, index: IndexStorageMode) -> Self {
        Self {
            sync_dir: absolutize(root, Path::new(&section.sync_dir)),
            exec: section.exec.clone(),
            index,
        }
    }

    /// Keep the sync directory out of `ignore`'s tree so mirrored files
    /// never come back as changes. A sync directory equal to the root would
    /// copy the tree onto itself and is rejected.
    pub fn exclude_from(&self, ignore: IgnoreList) -> Result<IgnoreList> {
        if normalize(&self.sync_dir) == ignore.root() {
            return Err(DevloopError::ConfigError(format!(
                "[target].sync_dir {} is the watched root",
                self.sync_dir.display()
            )));
        }
        Ok(ignore.with_excluded_dir(&self.sync_dir))
    }
}

/// Production [`PushHandler`].
///
/// Per push:
/// 1. surface a restart notice if the descriptor file itself changed;
/// 2. mirror changed files into the sync directory and remove deleted ones;
/// 3. run build commands, then restart the run or debug command.
pub struct SyncHandler<E: CommandExecutor> {
    fs: Arc<dyn FileSystem>,
    executor: Arc<E>,
    target: SyncTarget,
    index: Mutex<FileIndex>,
}

impl<E: CommandExecutor> std::fmt::Debug for SyncHandler<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncHandler")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl<E: CommandExecutor> SyncHandler<E> {
    /// Build a handler whose index lives where `target.index` says.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        executor: Arc<E>,
        target: SyncTarget,
        root: &Path,
    ) -> Result<Self> {
        let store: Box<dyn IndexStore> = match target.index {
            IndexStorageMode::File => Box::new(FileIndexStore::new(root.to_path_buf(), fs.clone())),
            IndexStorageMode::Memory => Box::new(MemoryIndexStore::new()),
        };
        Self::with_store(fs, executor, target, store)
    }

    pub fn with_store(
        fs: Arc<dyn FileSystem>,
        executor: Arc<E>,
        target: SyncTarget,
        store: Box<dyn IndexStore>,
    ) -> Result<Self> {
        let index = FileIndex::open(store)?;
        Ok(Self {
            fs,
            executor,
            target,
            index: Mutex::new(index),
        })
    }

    pub fn target(&self) -> &SyncTarget {
        &self.target
    }

    fn index(&self) -> MutexGuard<'_, FileIndex> {
        match self.index.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Number of files currently recorded as synced.
    pub fn indexed_files(&self) -> usize {
        self.index().len()
    }

    fn destination(&self, root: &Path, path: &Path) -> Option<(String, PathBuf)> {
        let rel = relative_str(root, path)?;
        if rel.is_empty() {
            return None;
        }
        let dest = self.target.sync_dir.join(&rel);
        Some((rel, dest))
    }

    /// Apply deletions and copies. Returns how many paths were touched.
    fn sync_files(
        &self,
        root: &Path,
        changed: &[PathBuf],
        deleted: &[PathBuf],
        ignore: &IgnoreList,
    ) -> Result<usize> {
        let mut touched = 0;
        let mut index = self.index();

        for path in deleted {
            let Some((rel, dest)) = self.destination(root, path) else {
                warn!(?path, "deleted path outside the root; skipping");
                continue;
            };
            self.fs.remove_all(&dest).map_err(push_error)?;
            index.forget(&rel);
            debug!(path = %rel, "removed from target");
            touched += 1;
        }

        for path in changed {
            let Some((rel, dest)) = self.destination(root, path) else {
                warn!(?path, "changed path outside the root; skipping");
                continue;
            };
            if self.fs.is_dir(path) {
                touched += self.copy_tree(root, path, ignore, &mut index)?;
            } else if self.fs.is_file(path) {
                self.copy_one(path, rel, &dest, &mut index)?;
                touched += 1;
            } else {
                // Vanished between the event and the push; a delete follows.
                debug!(path = %rel, "changed path no longer exists; skipping");
            }
        }

        if let Err(err) = index.persist() {
            warn!(error = %err, "failed to persist file index");
        }
        Ok(touched)
    }

    /// Mirror `dir` and every non-ignored entry below it.
    ///
    /// A directory moved into the tree arrives as a single event, and files
    /// written before its watch is attached produce none, so the contents
    /// are walked here.
    fn copy_tree(
        &self,
        root: &Path,
        dir: &Path,
        ignore: &IgnoreList,
        index: &mut FileIndex,
    ) -> Result<usize> {
        let mut touched = 0;
        let mut stack = vec![dir.to_path_buf()];

        while let Some(current) = stack.pop() {
            let Some((rel, dest)) = self.destination(root, &current) else {
                continue;
            };
            self.fs.create_dir_all(&dest).map_err(push_error)?;
            debug!(path = %rel, "created directory on target");
            touched += 1;

            let entries = match self.fs.read_dir(&current) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(path = %rel, error = %err, "cannot list directory; skipping subtree");
                    continue;
                }
            };
            for entry in entries {
                if ignore.matches(&entry) {
                    continue;
                }
                if self.fs.is_dir(&entry) {
                    stack.push(entry);
                } else if self.fs.is_file(&entry) {
                    if let Some((rel, dest)) = self.destination(root, &entry) {
                        self.copy_one(&entry, rel, &dest, index)?;
                        touched += 1;
                    }
                }
            }
        }

        Ok(touched)
    }

    fn copy_one(&self, path: &Path, rel: String, dest: &Path, index: &mut FileIndex) -> Result<()> {
        let hash = compute_file_hash(self.fs.as_ref(), path).map_err(push_error)?;
        self.fs.copy_file(path, dest).map_err(push_error)?;
        debug!(path = %rel, "copied to target");
        index.record(rel, hash);
        Ok(())
    }

    /// Reload the descriptor if its file is among `changed` and tell the user
    /// when the running session is out of date.
    fn check_descriptor(&self, changed: &[PathBuf], params: &WatchParameters) {
        let Some(descriptor_path) = params.descriptor_path.as_deref() else {
            return;
        };
        if !changed.iter().any(|p| p == descriptor_path) {
            return;
        }

        let reloaded = self
            .fs
            .read_to_string(descriptor_path)
            .map_err(DevloopError::from)
            .and_then(|s| parse_str(&s))
            .and_then(ConfigFile::try_from);

        match reloaded {
            Ok(cfg) => notice_for(&params.descriptor, &cfg.descriptor, &params.out),
            Err(err) => {
                warn!(error = %err, "changed descriptor is invalid");
                params
                    .out
                    .line(format!("Component descriptor is invalid, keeping the current one: {err}"));
            }
        }
    }

    async fn run_commands(&self, descriptor: &Descriptor, mode: RunMode, out: &OutputSink) -> Result<()> {
        let long_lived = descriptor
            .command_for(mode)
            .ok_or_else(|| DevloopError::MissingCommand(mode.to_string()))?;

        for build in descriptor.build_commands() {
            out.line(format!("Executing build command \"{}\"", build.cmd));
            self.executor.run(build, out).await?;
        }

        out.line(format!("Executing {mode} command \"{}\"", long_lived.cmd));
        self.executor.restart(long_lived, out).await
    }

    async fn push(&self, push: PushParameters, params: &WatchParameters) -> Result<()> {
        let (changed, deleted) = if push.full_sync {
            let diff = self
                .index()
                .diff(self.fs.as_ref(), &push.path, &params.ignore)
                .map_err(push_error)?;
            (diff.changed, diff.deleted)
        } else {
            (push.changed, push.deleted)
        };

        self.check_descriptor(&changed, params);

        let touched = self.sync_files(&push.path, &changed, &deleted, &params.ignore)?;
        info!(
            touched,
            changed = changed.len(),
            deleted = deleted.len(),
            sync_dir = ?self.target.sync_dir,
            "synced files to target"
        );
        params.out.line(format!(
            "Synced {} changed and {} deleted path(s)",
            changed.len(),
            deleted.len()
        ));

        if touched == 0 && !push.full_sync {
            debug!("nothing reached the target; commands not re-run");
            return Ok(());
        }

        self.run_commands(&params.descriptor, push.run_mode, &params.out)
            .await
    }
}

fn notice_for(current: &Descriptor, reloaded: &Descriptor, out: &OutputSink) {
    if current.endpoints() != reloaded.endpoints() {
        info!("descriptor endpoints changed");
        out.line("Endpoints changed in the component descriptor; restart devloop to expose them");
    } else if current != reloaded {
        info!("descriptor changed");
        out.line("Component descriptor changed; restart devloop to apply the new commands");
    }
}

fn push_error(err: anyhow::Error) -> DevloopError {
    DevloopError::PushFailed(format!("{err:#}"))
}

impl<E: CommandExecutor + 'static> PushHandler for SyncHandler<E> {
    fn regenerate_and_push<'a>(
        &'a self,
        push: PushParameters,
        params: &'a WatchParameters,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.push(push, params))
    }
}
