// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{IndexStorageMode, RunMode};

/// Top-level configuration as read from `devloop.toml`.
///
/// ```toml
/// [component]
/// name = "nodejs-api"
///
/// [[command]]
/// id = "install"
/// kind = "build"
/// cmd = "npm install"
///
/// [[command]]
/// id = "start"
/// kind = "run"
/// cmd = "npm start"
///
/// [[endpoint]]
/// name = "http"
/// target_port = 3000
///
/// [events]
/// pre_stop = ["stop-server"]
///
/// [watch]
/// ignore = ["node_modules", ".git"]
/// debounce_ms = 100
///
/// [target]
/// sync_dir = "/srv/projects"
/// exec = ["sh", "-c"]
/// ```
///
/// `[component]`, `[[command]]`, `[[endpoint]]` and `[events]` make up the
/// component descriptor; `[watch]` and `[target]` configure the dev session.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub component: ComponentSection,

    #[serde(default, rename = "command")]
    pub commands: Vec<CommandConfig>,

    #[serde(default, rename = "endpoint")]
    pub endpoints: Vec<EndpointConfig>,

    #[serde(default)]
    pub events: EventsSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub target: TargetSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub descriptor: Descriptor,
    pub watch: WatchSection,
    pub target: TargetSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        descriptor: Descriptor,
        watch: WatchSection,
        target: TargetSection,
    ) -> Self {
        Self {
            descriptor,
            watch,
            target,
        }
    }
}

/// `[component]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ComponentSection {
    pub name: String,
}

/// Kind of a descriptor command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// Runs to completion before the run/debug command is (re)started.
    Build,
    /// Long-lived command started after each sync in run mode.
    Run,
    /// Long-lived command started after each sync in debug mode.
    Debug,
    /// Only executed when referenced, e.g. from `[events].pre_stop`.
    Exec,
}

/// One `[[command]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CommandConfig {
    pub id: String,
    pub kind: CommandKind,
    pub cmd: String,

    /// Working directory inside the target environment.
    #[serde(default)]
    pub workdir: Option<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Marks the preferred command when several share a kind.
    #[serde(default, rename = "default")]
    pub is_default: bool,
}

/// One `[[endpoint]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    pub name: String,
    pub target_port: u16,

    #[serde(default)]
    pub path: Option<String>,
}

/// `[events]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EventsSection {
    /// Command ids executed, in order, when the session stops.
    #[serde(default)]
    pub pre_stop: Vec<String>,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Ignore patterns, relative to the watch root or absolute.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Quiet interval used to coalesce bursts of events.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Where the file index is kept between sessions.
    #[serde(default)]
    pub index: IndexStorageMode,
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            debounce_ms: default_debounce_ms(),
            index: IndexStorageMode::default(),
        }
    }
}

/// `[target]` section: where synced files land and how commands reach the
/// running environment.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetSection {
    /// Destination directory for synced files. Relative paths resolve
    /// against the watch root.
    #[serde(default = "default_sync_dir")]
    pub sync_dir: String,

    /// Program and leading arguments used to run a command in the target;
    /// the command line is appended as the last argument.
    #[serde(default = "default_exec")]
    pub exec: Vec<String>,
}

fn default_sync_dir() -> String {
    ".devloop/remote".to_string()
}

fn default_exec() -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string()]
}

impl Default for TargetSection {
    fn default() -> Self {
        Self {
            sync_dir: default_sync_dir(),
            exec: default_exec(),
        }
    }
}

/// The component descriptor: commands, endpoints and lifecycle events.
///
/// Treated as read-only for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    name: String,
    commands: Vec<CommandConfig>,
    endpoints: Vec<EndpointConfig>,
    pre_stop: Vec<String>,
}

impl Descriptor {
    pub(crate) fn new_unchecked(
        name: String,
        commands: Vec<CommandConfig>,
        endpoints: Vec<EndpointConfig>,
        pre_stop: Vec<String>,
    ) -> Self {
        Self {
            name,
            commands,
            endpoints,
            pre_stop,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[CommandConfig] {
        &self.commands
    }

    pub fn endpoints(&self) -> &[EndpointConfig] {
        &self.endpoints
    }

    pub fn command(&self, id: &str) -> Option<&CommandConfig> {
        self.commands.iter().find(|c| c.id == id)
    }

    /// Build commands in declaration order.
    pub fn build_commands(&self) -> impl Iterator<Item = &CommandConfig> {
        self.commands.iter().filter(|c| c.kind == CommandKind::Build)
    }

    /// The long-lived command for `mode`: the one flagged `default = true`,
    /// otherwise the first of that kind.
    pub fn command_for(&self, mode: RunMode) -> Option<&CommandConfig> {
        let kind = match mode {
            RunMode::Run => CommandKind::Run,
            RunMode::Debug => CommandKind::Debug,
        };
        let mut of_kind = self.commands.iter().filter(|c| c.kind == kind);
        let first = of_kind.clone().next();
        of_kind.find(|c| c.is_default).or(first)
    }

    /// Commands referenced by `[events].pre_stop`, in order.
    pub fn pre_stop_commands(&self) -> Vec<&CommandConfig> {
        self.pre_stop
            .iter()
            .filter_map(|id| self.command(id))
            .collect()
    }
}
