#![allow(dead_code)]

use std::collections::BTreeMap;

use devloop::config::{
    CommandConfig, CommandKind, ComponentSection, ConfigFile, Descriptor, EndpointConfig,
    EventsSection, RawConfigFile, TargetSection, WatchSection,
};

/// Builder for `ConfigFile` / `Descriptor` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(component: &str) -> Self {
        Self {
            config: RawConfigFile {
                component: ComponentSection {
                    name: component.to_string(),
                },
                commands: Vec::new(),
                endpoints: Vec::new(),
                events: EventsSection::default(),
                watch: WatchSection::default(),
                target: TargetSection::default(),
            },
        }
    }

    pub fn with_command(mut self, command: CommandConfig) -> Self {
        self.config.commands.push(command);
        self
    }

    pub fn with_endpoint(mut self, name: &str, port: u16) -> Self {
        self.config.endpoints.push(EndpointConfig {
            name: name.to_string(),
            target_port: port,
            path: None,
        });
        self
    }

    pub fn with_pre_stop(mut self, id: &str) -> Self {
        self.config.events.pre_stop.push(id.to_string());
        self
    }

    pub fn with_ignore(mut self, pattern: &str) -> Self {
        self.config.watch.ignore.push(pattern.to_string());
        self
    }

    pub fn with_sync_dir(mut self, dir: &str) -> Self {
        self.config.target.sync_dir = dir.to_string();
        self
    }

    /// The unvalidated config, for validation tests.
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    pub fn descriptor(self) -> Descriptor {
        self.build().descriptor
    }
}

/// A descriptor with one `run` command, good enough for most engine tests.
pub fn simple_descriptor(name: &str) -> Descriptor {
    ConfigFileBuilder::new(name)
        .with_command(CommandBuilder::run("start", "echo started").build())
        .descriptor()
}

/// Builder for `CommandConfig`.
pub struct CommandBuilder {
    command: CommandConfig,
}

impl CommandBuilder {
    pub fn new(id: &str, kind: CommandKind, cmd: &str) -> Self {
        Self {
            command: CommandConfig {
                id: id.to_string(),
                kind,
                cmd: cmd.to_string(),
                workdir: None,
                env: BTreeMap::new(),
                is_default: false,
            },
        }
    }

    pub fn build_cmd(id: &str, cmd: &str) -> Self {
        Self::new(id, CommandKind::Build, cmd)
    }

    pub fn run(id: &str, cmd: &str) -> Self {
        Self::new(id, CommandKind::Run, cmd)
    }

    pub fn debug(id: &str, cmd: &str) -> Self {
        Self::new(id, CommandKind::Debug, cmd)
    }

    pub fn exec(id: &str, cmd: &str) -> Self {
        Self::new(id, CommandKind::Exec, cmd)
    }

    pub fn workdir(mut self, dir: &str) -> Self {
        self.command.workdir = Some(dir.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.command.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn default(mut self, val: bool) -> Self {
        self.command.is_default = val;
        self
    }

    pub fn build(self) -> CommandConfig {
        self.command
    }
}
