// src/engine/cleanup.rs

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Descriptor;
use crate::errors::Result;
use crate::exec::CommandExecutor;
use crate::types::{BoxFuture, OutputSink};

/// Runs when a watch session ends through cancellation or a source failure.
pub trait CleanupRunner: Send {
    fn cleanup<'a>(
        &'a mut self,
        descriptor: &'a Descriptor,
        out: &'a OutputSink,
    ) -> BoxFuture<'a, Result<()>>;
}

/// Executes the descriptor's `pre_stop` commands in order, then stops the
/// long-lived run/debug process.
///
/// Every step is attempted even if an earlier one failed; the first error is
/// returned so the controller can log it.
pub struct PreStopCleanup<E: CommandExecutor> {
    executor: Arc<E>,
}

impl<E: CommandExecutor> PreStopCleanup<E> {
    pub fn new(executor: Arc<E>) -> Self {
        Self { executor }
    }
}

impl<E: CommandExecutor> std::fmt::Debug for PreStopCleanup<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreStopCleanup").finish_non_exhaustive()
    }
}

impl<E: CommandExecutor + 'static> CleanupRunner for PreStopCleanup<E> {
    fn cleanup<'a>(
        &'a mut self,
        descriptor: &'a Descriptor,
        out: &'a OutputSink,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            out.line(format!("Cleaning up component {}, please wait", descriptor.name()));
            let mut first_err = None;

            for command in descriptor.pre_stop_commands() {
                out.line(format!("Executing pre-stop command \"{}\"", command.cmd));
                if let Err(err) = self.executor.run(command, out).await {
                    warn!(command = %command.id, error = %err, "pre-stop command failed");
                    first_err.get_or_insert(err);
                }
            }

            if let Err(err) = self.executor.stop().await {
                warn!(error = %err, "failed to stop long-lived command");
                first_err.get_or_insert(err);
            }

            info!(component = %descriptor.name(), "cleanup finished");
            out.line("Cleanup done");
            match first_err {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })
    }
}
