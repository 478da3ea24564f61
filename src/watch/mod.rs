// src/watch/mod.rs

//! File watching and change classification.
//!
//! This module is responsible for:
//! - Mapping `notify` events onto [`RawEvent`]s.
//! - Ignore-path matching.
//! - Keeping one watch handle per live directory ([`WatchedPathRegistry`]).
//! - Classifying bursts into [`ChangeSet`]s.
//! - Debouncing bursts ([`Coalescer`]).
//!
//! It does **not** know how changes reach the target environment; that is
//! the engine's and the push handler's job.

pub mod changeset;
pub mod classifier;
pub mod coalescer;
pub mod event;
pub mod ignore;
pub mod path_utils;
pub mod registry;
pub mod source;

pub use changeset::ChangeSet;
pub use classifier::{Classifier, EventClassifier};
pub use coalescer::{Batch, Coalescer, DEFAULT_DEBOUNCE};
pub use event::{EventKind, RawEvent, raw_events_from_notify};
pub use ignore::{IgnoreList, STATE_DIR};
pub use registry::{PathSet, WatchBackend, WatchedPathRegistry};
pub use source::{NotificationSource, NotifyBackend, SourceSender};
