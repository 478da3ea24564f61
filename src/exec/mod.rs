// src/exec/mod.rs

//! Command execution in the target environment.
//!
//! - [`CommandExecutor`] is the capability the push handler and the cleanup
//!   runner use; tests swap in a recorder.
//! - [`shell`] provides [`ShellExecutor`], which spawns the configured exec
//!   prefix (`sh -c` by default, or e.g. `kubectl exec <pod> -- sh -c`)
//!   with `tokio::process` and supervises the single long-lived run/debug
//!   process.

pub mod shell;

use crate::config::CommandConfig;
use crate::errors::Result;
use crate::types::{BoxFuture, OutputSink};

pub use shell::ShellExecutor;

pub trait CommandExecutor: Send + Sync {
    /// Run `command` to completion. A non-zero exit is an error.
    fn run<'a>(
        &'a self,
        command: &'a CommandConfig,
        out: &'a OutputSink,
    ) -> BoxFuture<'a, Result<()>>;

    /// Start `command` as the long-lived process, killing any previous
    /// instance first. Returns once the new process has been spawned.
    fn restart<'a>(
        &'a self,
        command: &'a CommandConfig,
        out: &'a OutputSink,
    ) -> BoxFuture<'a, Result<()>>;

    /// Stop the long-lived process, if any.
    fn stop(&self) -> BoxFuture<'_, Result<()>>;
}
