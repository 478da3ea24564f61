// src/watch/event.rs

//! Raw filesystem notifications and their mapping from `notify` events.

use std::path::{Path, PathBuf};

use notify::EventKind as NotifyKind;
use notify::event::{ModifyKind, RenameMode};

/// Operation carried by a single notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Create,
    Write,
    Remove,
    Rename,
}

impl EventKind {
    /// Remove and rename both mean the path no longer exists where it was.
    pub fn is_removal(&self) -> bool {
        matches!(self, EventKind::Remove | EventKind::Rename)
    }
}

/// A single filesystem notification for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub path: PathBuf,
    pub kind: EventKind,
}

impl RawEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self::new(path, EventKind::Create)
    }

    pub fn write(path: impl Into<PathBuf>) -> Self {
        Self::new(path, EventKind::Write)
    }

    pub fn remove(path: impl Into<PathBuf>) -> Self {
        Self::new(path, EventKind::Remove)
    }

    pub fn rename(path: impl Into<PathBuf>) -> Self {
        Self::new(path, EventKind::Rename)
    }
}

/// Flatten a `notify::Event` into per-path [`RawEvent`]s.
///
/// Backends disagree on how renames are reported:
/// - inotify emits `From` and `To` halves (sometimes paired as `Both`);
/// - FSEvents and others emit `Any`, leaving the direction unknown.
///
/// The old name maps to `Rename` and the new name to `Create`. For an
/// undirected rename we look at the disk: a path that still exists was the
/// destination. Access events carry no content change and are dropped.
pub fn raw_events_from_notify(event: notify::Event) -> Vec<RawEvent> {
    raw_events_with(event, |p| p.exists())
}

/// Same as [`raw_events_from_notify`] with an injectable existence check.
pub fn raw_events_with(
    event: notify::Event,
    exists: impl Fn(&Path) -> bool,
) -> Vec<RawEvent> {
    let notify::Event { kind, paths, .. } = event;

    match kind {
        NotifyKind::Access(_) => Vec::new(),
        NotifyKind::Create(_) => paths.into_iter().map(RawEvent::create).collect(),
        NotifyKind::Remove(_) => paths.into_iter().map(RawEvent::remove).collect(),
        NotifyKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => paths.into_iter().map(RawEvent::rename).collect(),
            RenameMode::To => paths.into_iter().map(RawEvent::create).collect(),
            RenameMode::Both => {
                let mut out = Vec::with_capacity(paths.len());
                let mut iter = paths.into_iter();
                if let Some(from) = iter.next() {
                    out.push(RawEvent::rename(from));
                }
                out.extend(iter.map(RawEvent::create));
                out
            }
            _ => paths
                .into_iter()
                .map(|p| {
                    if exists(&p) {
                        RawEvent::create(p)
                    } else {
                        RawEvent::rename(p)
                    }
                })
                .collect(),
        },
        NotifyKind::Modify(_) | NotifyKind::Any | NotifyKind::Other => {
            paths.into_iter().map(RawEvent::write).collect()
        }
    }
}
