// src/watch/changeset.rs

use std::path::{Path, PathBuf};

/// One coalesced batch of classified changes.
///
/// Invariants maintained by [`ChangeSet::record_changed`] and
/// [`ChangeSet::record_deleted`]:
/// - a path appears at most once in each list, at the position of its last
///   occurrence;
/// - a path never appears in both lists; the most recent event decides which.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changed: Vec<PathBuf>,
    deleted: Vec<PathBuf>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_changed(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        remove_path(&mut self.deleted, &path);
        remove_path(&mut self.changed, &path);
        self.changed.push(path);
    }

    pub fn record_deleted(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        remove_path(&mut self.changed, &path);
        remove_path(&mut self.deleted, &path);
        self.deleted.push(path);
    }

    pub fn changed(&self) -> &[PathBuf] {
        &self.changed
    }

    pub fn deleted(&self) -> &[PathBuf] {
        &self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changed.len() + self.deleted.len()
    }

    pub fn into_parts(self) -> (Vec<PathBuf>, Vec<PathBuf>) {
        (self.changed, self.deleted)
    }
}

fn remove_path(list: &mut Vec<PathBuf>, path: &Path) {
    list.retain(|p| p != path);
}
