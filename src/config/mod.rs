// src/config/mod.rs

//! Configuration loading and validation for devloop.
//!
//! Responsibilities:
//! - Define the TOML-backed data model, including the component descriptor
//!   (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate invariants such as unique command ids and resolvable
//!   `pre_stop` references (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_descriptor, load_from_path, parse_str};
pub use model::{
    CommandConfig, CommandKind, ComponentSection, ConfigFile, Descriptor, EndpointConfig,
    EventsSection, RawConfigFile, TargetSection, WatchSection,
};
