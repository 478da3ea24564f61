// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, Descriptor, RawConfigFile};
use crate::errors::Result;

/// Default file name looked up in the project root.
pub const DEFAULT_CONFIG_FILE: &str = "devloop.toml";

/// Read and deserialize a configuration file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}

/// Deserialize configuration from a TOML string.
pub fn parse_str(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Load a configuration file and validate it.
///
/// This is the entry point the rest of the crate uses; the push handler also
/// calls it to re-read the descriptor when the file changes mid-session.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw = load_from_path(&path)?;
    ConfigFile::try_from(raw)
}

/// Convenience for callers that only need the component descriptor.
pub fn load_descriptor(path: impl AsRef<Path>) -> Result<Descriptor> {
    Ok(load_and_validate(path)?.descriptor)
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}
