// src/push/index.rs

//! Content index of what has been synced to the target.
//!
//! Maps root-relative file paths to blake3 hashes of the content last pushed.
//! A full sync diffs the working tree against it so only changed files are
//! copied and files that disappeared while devloop was not running are
//! removed from the target.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::watch::ignore::IgnoreList;
use crate::watch::path_utils::relative_str;

/// Relative path (from the watch root) to the persisted index.
pub const INDEX_FILE_PATH: &str = ".devloop/file-index";

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Abstract storage for the index.
pub trait IndexStore: Send {
    fn load(&self) -> Result<BTreeMap<String, String>>;
    fn save(&mut self, entries: &BTreeMap<String, String>) -> Result<()>;
}

/// Stores the index in `<root>/.devloop/file-index`, one `<hash> <path>`
/// line per file.
#[derive(Debug)]
pub struct FileIndexStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileIndexStore {
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { root, fs }
    }

    fn path(&self) -> PathBuf {
        self.root.join(INDEX_FILE_PATH)
    }
}

impl IndexStore for FileIndexStore {
    fn load(&self) -> Result<BTreeMap<String, String>> {
        let path = self.path();
        if !self.fs.exists(&path) {
            return Ok(BTreeMap::new());
        }

        let contents = self
            .fs
            .read_to_string(&path)
            .with_context(|| format!("reading file index at {:?}", path))?;

        let mut entries = BTreeMap::new();
        for line in contents.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            // Hash first: paths may contain spaces.
            if let Some((hash, rel)) = line.split_once(' ') {
                entries.insert(rel.to_string(), hash.to_string());
            }
        }
        Ok(entries)
    }

    fn save(&mut self, entries: &BTreeMap<String, String>) -> Result<()> {
        let path = self.path();
        let mut out = String::new();
        for (rel, hash) in entries {
            out.push_str(hash);
            out.push(' ');
            out.push_str(rel);
            out.push('\n');
        }
        self.fs
            .write(&path, out.as_bytes())
            .with_context(|| format!("writing file index at {:?}", path))?;
        debug!(entries = entries.len(), "stored file index (file)");
        Ok(())
    }
}

/// Keeps the index in memory only.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    entries: BTreeMap<String, String>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexStore for MemoryIndexStore {
    fn load(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.entries.clone())
    }

    fn save(&mut self, entries: &BTreeMap<String, String>) -> Result<()> {
        self.entries = entries.clone();
        Ok(())
    }
}

/// Result of comparing the working tree with the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDiff {
    /// Absolute paths of files that are new or whose content changed.
    pub changed: Vec<PathBuf>,
    /// Absolute paths of indexed files that no longer exist.
    pub deleted: Vec<PathBuf>,
}

pub struct FileIndex {
    entries: BTreeMap<String, String>,
    store: Box<dyn IndexStore>,
}

impl std::fmt::Debug for FileIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileIndex")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl FileIndex {
    pub fn open(store: Box<dyn IndexStore>) -> Result<Self> {
        let entries = store.load()?;
        debug!(entries = entries.len(), "loaded file index");
        Ok(Self { entries, store })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hash_of(&self, rel: &str) -> Option<&str> {
        self.entries.get(rel).map(String::as_str)
    }

    /// Walk every non-ignored file under `root` and compare it with the index.
    pub fn diff(&self, fs: &dyn FileSystem, root: &Path, ignore: &IgnoreList) -> Result<IndexDiff> {
        let mut diff = IndexDiff::default();
        let mut seen = std::collections::BTreeSet::new();
        let mut stack = vec![root.to_path_buf()];

        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                if ignore.matches(&path) {
                    continue;
                }
                if fs.is_dir(&path) {
                    stack.push(path);
                    continue;
                }
                if !fs.is_file(&path) {
                    continue;
                }
                let Some(rel) = relative_str(root, &path) else {
                    continue;
                };
                let hash = compute_file_hash(fs, &path)?;
                if self.hash_of(&rel) != Some(hash.as_str()) {
                    diff.changed.push(path);
                }
                seen.insert(rel);
            }
        }

        for rel in self.entries.keys() {
            if !seen.contains(rel) {
                diff.deleted.push(root.join(rel));
            }
        }

        diff.changed.sort();
        info!(
            changed = diff.changed.len(),
            deleted = diff.deleted.len(),
            "compared working tree with file index"
        );
        Ok(diff)
    }

    pub fn record(&mut self, rel: impl Into<String>, hash: impl Into<String>) {
        self.entries.insert(rel.into(), hash.into());
    }

    /// Forget `rel` and, if it was a directory, everything below it.
    pub fn forget(&mut self, rel: &str) {
        let dir_prefix = format!("{rel}/");
        self.entries
            .retain(|k, _| k != rel && !k.starts_with(&dir_prefix));
    }

    pub fn persist(&mut self) -> Result<()> {
        self.store.save(&self.entries)
    }
}
