// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{CommandKind, ConfigFile, Descriptor, RawConfigFile};
use crate::errors::{DevloopError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DevloopError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let descriptor = Descriptor::new_unchecked(
            raw.component.name,
            raw.commands,
            raw.endpoints,
            raw.events.pre_stop,
        );
        Ok(ConfigFile::new_unchecked(descriptor, raw.watch, raw.target))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_component(cfg)?;
    validate_commands(cfg)?;
    validate_endpoints(cfg)?;
    validate_events(cfg)?;
    validate_session(cfg)?;
    Ok(())
}

fn validate_component(cfg: &RawConfigFile) -> Result<()> {
    if cfg.component.name.trim().is_empty() {
        return Err(DevloopError::ConfigError(
            "[component].name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_commands(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for command in &cfg.commands {
        if command.id.trim().is_empty() {
            return Err(DevloopError::ConfigError(
                "every [[command]] needs a non-empty id".to_string(),
            ));
        }
        if !seen.insert(command.id.as_str()) {
            return Err(DevloopError::ConfigError(format!(
                "duplicate command id '{}'",
                command.id
            )));
        }
        if command.cmd.trim().is_empty() {
            return Err(DevloopError::ConfigError(format!(
                "command '{}' has an empty cmd",
                command.id
            )));
        }
    }

    if !cfg.commands.iter().any(|c| c.kind == CommandKind::Run) {
        return Err(DevloopError::ConfigError(
            "descriptor must declare at least one command with kind = \"run\"".to_string(),
        ));
    }

    for kind in [CommandKind::Run, CommandKind::Debug] {
        let defaults = cfg
            .commands
            .iter()
            .filter(|c| c.kind == kind && c.is_default)
            .count();
        if defaults > 1 {
            return Err(DevloopError::ConfigError(format!(
                "more than one {kind:?} command is marked default"
            )));
        }
    }
    Ok(())
}

fn validate_endpoints(cfg: &RawConfigFile) -> Result<()> {
    let mut names = HashSet::new();
    for endpoint in &cfg.endpoints {
        if !names.insert(endpoint.name.as_str()) {
            return Err(DevloopError::ConfigError(format!(
                "duplicate endpoint name '{}'",
                endpoint.name
            )));
        }
        if endpoint.target_port == 0 {
            return Err(DevloopError::ConfigError(format!(
                "endpoint '{}' must have a non-zero target_port",
                endpoint.name
            )));
        }
    }
    Ok(())
}

fn validate_events(cfg: &RawConfigFile) -> Result<()> {
    for id in &cfg.events.pre_stop {
        if !cfg.commands.iter().any(|c| &c.id == id) {
            return Err(DevloopError::ConfigError(format!(
                "[events].pre_stop references unknown command '{id}'"
            )));
        }
    }
    Ok(())
}

fn validate_session(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.debounce_ms == 0 {
        return Err(DevloopError::ConfigError(
            "[watch].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.target.exec.is_empty() {
        return Err(DevloopError::ConfigError(
            "[target].exec must name at least a program".to_string(),
        ));
    }
    Ok(())
}
