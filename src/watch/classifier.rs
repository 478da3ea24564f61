// src/watch/classifier.rs

//! Turns a burst of raw notifications into a [`ChangeSet`].

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::watch::changeset::ChangeSet;
use crate::watch::event::{EventKind, RawEvent};
use crate::watch::ignore::IgnoreList;
use crate::watch::path_utils::absolutize;
use crate::watch::registry::PathSet;

/// Classification capability used by the lifecycle controller.
pub trait Classifier: Send + Sync {
    fn classify(
        &self,
        events: Vec<RawEvent>,
        ignore: &IgnoreList,
        paths: &mut dyn PathSet,
    ) -> ChangeSet;
}

/// Default classifier.
///
/// - Ignored paths are dropped before anything else happens.
/// - Remove/rename: the path's watch handle is revoked and it goes to
///   `deleted`.
/// - Everything else goes to `changed`; creations are also handed to
///   [`PathSet::rediscover`] so new directories start being watched.
///
/// Registry mutations are applied after the pass over the burst, removals
/// first, so a directory that was created and removed within one window ends
/// up unwatched.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventClassifier;

impl Classifier for EventClassifier {
    fn classify(
        &self,
        events: Vec<RawEvent>,
        ignore: &IgnoreList,
        paths: &mut dyn PathSet,
    ) -> ChangeSet {
        let mut changes = ChangeSet::new();
        let mut removed: Vec<PathBuf> = Vec::new();
        let mut created: Vec<PathBuf> = Vec::new();

        for event in events {
            let path = absolutize(ignore.root(), &event.path);
            if ignore.matches(&path) {
                trace!(?path, kind = ?event.kind, "ignored event");
                continue;
            }

            match event.kind {
                EventKind::Remove | EventKind::Rename => {
                    changes.record_deleted(path.clone());
                    created.retain(|p| p != &path);
                    removed.push(path);
                }
                EventKind::Create => {
                    changes.record_changed(path.clone());
                    created.push(path);
                }
                EventKind::Write => {
                    changes.record_changed(path);
                }
            }
        }

        for path in &removed {
            paths.remove(path);
        }
        for path in &created {
            paths.rediscover(path);
        }

        debug!(
            changed = changes.changed().len(),
            deleted = changes.deleted().len(),
            "classified burst"
        );
        changes
    }
}
