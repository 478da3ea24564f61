// src/watch/ignore.rs

//! Ignore-path matching.
//!
//! Two kinds of pattern are accepted:
//!
//! - Plain paths (`node_modules`, `/abs/build`, `src/gen`). Relative ones are
//!   resolved against the watch root; a path is ignored when it equals the
//!   pattern or lies below it. Comparison is component-wise and
//!   case-sensitive, so `build` ignores `build/out.o` but not `builder.rs`.
//! - Globs (any pattern containing `*`, `?`, `[` or `{`), compiled with
//!   `globset` and matched against the root-relative path with `/`
//!   separators.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::watch::path_utils::{absolutize, normalize, relative_str};

/// Directory holding devloop's own state (file index, local sync target).
/// Always ignored so syncing never feeds back into the watcher.
pub const STATE_DIR: &str = ".devloop";

#[derive(Clone)]
pub struct IgnoreList {
    root: PathBuf,
    prefixes: Vec<PathBuf>,
    globs: Option<GlobSet>,
    patterns: Vec<String>,
}

impl IgnoreList {
    /// Compile `patterns` relative to `root`. The state directory is always
    /// appended.
    pub fn new<S: AsRef<str>>(root: impl AsRef<Path>, patterns: &[S]) -> Result<Self> {
        let root = normalize(root.as_ref());
        let mut prefixes = vec![root.join(STATE_DIR)];
        let mut glob_patterns = Vec::new();
        let mut kept = Vec::with_capacity(patterns.len());

        for pat in patterns {
            let pat = pat.as_ref().trim();
            if pat.is_empty() {
                continue;
            }
            kept.push(pat.to_string());
            if is_glob(pat) {
                glob_patterns.push(pat);
            } else {
                prefixes.push(absolutize(&root, Path::new(pat)));
            }
        }

        let globs = if glob_patterns.is_empty() {
            None
        } else {
            Some(build_globset(&glob_patterns).context("building ignore globset")?)
        };

        Ok(Self {
            root,
            prefixes,
            globs,
            patterns: kept,
        })
    }

    /// An ignore list with no user patterns.
    pub fn empty(root: impl AsRef<Path>) -> Self {
        Self {
            root: normalize(root.as_ref()),
            prefixes: vec![normalize(root.as_ref()).join(STATE_DIR)],
            globs: None,
            patterns: Vec::new(),
        }
    }

    /// Also ignore `dir` and everything below it if it lies inside the root.
    /// Directories outside the root never produce events and are left out.
    pub fn with_excluded_dir(mut self, dir: &Path) -> Self {
        let dir = absolutize(&self.root, dir);
        if dir != self.root && dir.starts_with(&self.root) && !self.prefixes.contains(&dir) {
            self.prefixes.push(dir);
        }
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The user-supplied patterns, in order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Returns true if `path` (absolute, or relative to the root) is ignored.
    pub fn matches(&self, path: &Path) -> bool {
        let abs = absolutize(&self.root, path);

        if self.prefixes.iter().any(|prefix| abs.starts_with(prefix)) {
            return true;
        }

        if let Some(globs) = &self.globs {
            if let Some(rel) = relative_str(&self.root, &abs) {
                if !rel.is_empty() && globs.is_match(&rel) {
                    return true;
                }
            }
        }

        false
    }
}

impl fmt::Debug for IgnoreList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreList")
            .field("root", &self.root)
            .field("patterns", &self.patterns)
            .finish()
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
