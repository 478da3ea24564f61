// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `devloop`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "devloop",
    version,
    about = "Watch a source tree and keep a running dev environment in sync.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML) holding the component descriptor.
    ///
    /// Default: `devloop.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "devloop.toml")]
    pub config: String,

    /// Directory to watch and push.
    ///
    /// Defaults to the directory containing the config file.
    #[arg(long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Extra ignore pattern, appended to `[watch].ignore`. Repeatable.
    #[arg(long = "ignore", value_name = "PATTERN")]
    pub ignore: Vec<String>,

    /// Start the debug command instead of the run command.
    #[arg(long)]
    pub debug: bool,

    /// Push once and keep the started command running until Ctrl-C, without
    /// watching for changes.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEVLOOP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the descriptor, but don't push anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
