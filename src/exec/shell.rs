// src/exec/shell.rs

//! Process-backed command executor.

use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, warn};

use crate::config::CommandConfig;
use crate::errors::{DevloopError, Result};
use crate::exec::CommandExecutor;
use crate::types::{BoxFuture, OutputSink};

/// Handle for the currently running long-lived process.
///
/// - `cancel` asks the supervising task to kill the child.
/// - `handle` is the Tokio task waiting on the child.
struct ActiveProcess {
    id: String,
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Runs descriptor commands through an exec prefix.
///
/// With the default prefix `["sh", "-c"]` commands run locally; a prefix such
/// as `["kubectl", "exec", "web-0", "--", "sh", "-c"]` runs them inside a
/// container. At most one long-lived process exists at a time.
pub struct ShellExecutor {
    prefix: Vec<String>,
    active: Mutex<Option<ActiveProcess>>,
}

impl std::fmt::Debug for ShellExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellExecutor")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl ShellExecutor {
    pub fn new(prefix: Vec<String>) -> Self {
        Self {
            prefix,
            active: Mutex::new(None),
        }
    }

    fn build(&self, command: &CommandConfig) -> Result<Command> {
        let (program, args) = self.prefix.split_first().ok_or_else(|| {
            DevloopError::ConfigError("exec prefix must name a program".to_string())
        })?;

        let script = match &command.workdir {
            Some(dir) => format!("cd '{}' && {}", dir.replace('\'', r"'\''"), command.cmd),
            None => command.cmd.clone(),
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg(script)
            .envs(&command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd)
    }

    fn spawn(&self, command: &CommandConfig, out: &OutputSink) -> Result<Child> {
        let mut child = self
            .build(command)?
            .spawn()
            .with_context(|| format!("spawning process for command '{}'", command.id))?;

        if let Some(stdout) = child.stdout.take() {
            forward_stdout(stdout, out.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            log_stderr(stderr, command.id.clone());
        }
        Ok(child)
    }

    async fn run_inner(&self, command: &CommandConfig, out: &OutputSink) -> Result<()> {
        info!(command = %command.id, cmd = %command.cmd, "running command");
        let mut child = self.spawn(command, out)?;

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for command '{}'", command.id))?;

        let code = status.code().unwrap_or(-1);
        info!(command = %command.id, exit_code = code, success = status.success(), "command exited");

        if status.success() {
            Ok(())
        } else {
            Err(DevloopError::CommandFailed {
                id: command.id.clone(),
                reason: format!("exit code {code}"),
            })
        }
    }

    async fn restart_inner(&self, command: &CommandConfig, out: &OutputSink) -> Result<()> {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            stop_process(previous).await;
        }

        info!(command = %command.id, cmd = %command.cmd, "starting long-lived command");
        let mut child = self.spawn(command, out)?;

        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let id = command.id.clone();
        let task_id = id.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) => info!(
                        command = %task_id,
                        exit_code = status.code().unwrap_or(-1),
                        "long-lived command exited"
                    ),
                    Err(err) => warn!(command = %task_id, error = %err, "failed waiting on long-lived command"),
                },
                _ = &mut cancel_rx => {
                    debug!(command = %task_id, "stopping long-lived command");
                    if let Err(err) = child.kill().await {
                        warn!(command = %task_id, error = %err, "failed to kill long-lived command");
                    }
                }
            }
        });

        *active = Some(ActiveProcess {
            id,
            cancel: Some(cancel_tx),
            handle,
        });
        Ok(())
    }

    async fn stop_inner(&self) -> Result<()> {
        if let Some(previous) = self.active.lock().await.take() {
            stop_process(previous).await;
        }
        Ok(())
    }
}

async fn stop_process(mut process: ActiveProcess) {
    if let Some(cancel) = process.cancel.take() {
        if cancel.send(()).is_err() {
            debug!(command = %process.id, "long-lived command had already exited");
        }
    }
    if let Err(err) = process.handle.await {
        warn!(command = %process.id, error = %err, "supervisor task for long-lived command panicked");
    }
}

fn forward_stdout(stdout: impl AsyncRead + Unpin + Send + 'static, out: OutputSink) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            out.line(line);
        }
    });
}

// Always consume stderr so buffers don't fill; log at debug.
fn log_stderr(stderr: impl AsyncRead + Unpin + Send + 'static, id: String) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(command = %id, "stderr: {}", line);
        }
    });
}

impl CommandExecutor for ShellExecutor {
    fn run<'a>(
        &'a self,
        command: &'a CommandConfig,
        out: &'a OutputSink,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.run_inner(command, out))
    }

    fn restart<'a>(
        &'a self,
        command: &'a CommandConfig,
        out: &'a OutputSink,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.restart_inner(command, out))
    }

    fn stop(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.stop_inner())
    }
}
