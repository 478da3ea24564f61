// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevloopError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The watch root could not be registered at all.
    #[error("unable to watch {path:?}: {reason}")]
    WatchSetup { path: PathBuf, reason: String },

    /// The underlying notification source reported an error or went away.
    #[error("file watcher failed: {0}")]
    WatcherFailed(String),

    #[error("push failed: {0}")]
    PushFailed(String),

    #[error("command '{id}' failed: {reason}")]
    CommandFailed { id: String, reason: String },

    #[error("no {0} command defined in the component descriptor")]
    MissingCommand(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<notify::Error> for DevloopError {
    fn from(err: notify::Error) -> Self {
        DevloopError::WatcherFailed(err.to_string())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DevloopError>;
