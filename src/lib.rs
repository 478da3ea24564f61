// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod push;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{CleanupRunner, PreStopCleanup, WatchParameters, start_with_handler, watch};
use crate::exec::ShellExecutor;
use crate::fs::RealFileSystem;
use crate::push::{SyncHandler, SyncTarget};
use crate::types::{OutputSink, RunMode};
use crate::watch::IgnoreList;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - ignore list, sync target, executor and push handler
/// - the initial full push
/// - the watch session (or a plain wait in `--once` mode)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let root = match &args.path {
        Some(p) => p.clone(),
        None => config_root_dir(&config_path),
    };
    let root = std::fs::canonicalize(&root)
        .with_context(|| format!("resolving watch root {}", root.display()))?;

    let mut patterns = cfg.watch.ignore.clone();
    patterns.extend(args.ignore.iter().cloned());
    let mode = RunMode::from_debug_flag(args.debug);
    let target = SyncTarget::from_section(&cfg.target, &root, cfg.watch.index);
    let ignore = target.exclude_from(IgnoreList::new(&root, &patterns)?)?;
    info!(?root, ?target, %mode, "devloop session configured");

    let executor = Arc::new(ShellExecutor::new(target.exec.clone()));
    let handler = SyncHandler::new(Arc::new(RealFileSystem), executor.clone(), target, &root)?;

    let descriptor = Arc::new(cfg.descriptor);
    let mut params = WatchParameters::new(&root, descriptor.clone(), Arc::new(handler))
        .with_ignore(ignore)
        .with_run_mode(mode)
        .with_output(OutputSink::stdout())
        .with_debounce(Duration::from_millis(cfg.watch.debounce_ms));
    if let Ok(canonical) = std::fs::canonicalize(&config_path) {
        if canonical.starts_with(&root) {
            params = params.with_descriptor_path(canonical);
        }
    }

    start_with_handler(&params).await?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received; shutting down");
            cancel.cancel();
        });
    }

    let cleanup = PreStopCleanup::new(executor);

    if args.once {
        cancel.cancelled().await;
        let mut cleanup = cleanup;
        if let Err(err) = cleanup.cleanup(&descriptor, &params.out).await {
            warn!(error = %err, "cleanup failed");
        }
        return Ok(());
    }

    params
        .out
        .line(format!("Watching for changes in {}", root.display()));
    watch(&params, cleanup, cancel).await?;
    Ok(())
}

/// Figure out a sensible project root for watching.
///
/// - If the config path has a non-empty parent (e.g. "app/devloop.toml"),
///   we use that directory.
/// - If it's just a bare filename like "devloop.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print the descriptor and session settings.
fn print_dry_run(cfg: &ConfigFile) {
    let descriptor = &cfg.descriptor;
    println!("devloop dry-run");
    println!("  component = {}", descriptor.name());
    println!("  watch.debounce_ms = {}", cfg.watch.debounce_ms);
    println!("  watch.index = {:?}", cfg.watch.index);
    if !cfg.watch.ignore.is_empty() {
        println!("  watch.ignore = {:?}", cfg.watch.ignore);
    }
    println!("  target.sync_dir = {}", cfg.target.sync_dir);
    println!("  target.exec = {:?}", cfg.target.exec);
    println!();

    println!("commands ({}):", descriptor.commands().len());
    for command in descriptor.commands() {
        let default = if command.is_default { " (default)" } else { "" };
        println!("  - {} [{:?}]{default}", command.id, command.kind);
        println!("      cmd: {}", command.cmd);
        if let Some(ref dir) = command.workdir {
            println!("      workdir: {dir}");
        }
        if !command.env.is_empty() {
            println!("      env: {:?}", command.env);
        }
    }

    if !descriptor.endpoints().is_empty() {
        println!();
        println!("endpoints ({}):", descriptor.endpoints().len());
        for endpoint in descriptor.endpoints() {
            match endpoint.path {
                Some(ref path) => println!("  - {} :{}{path}", endpoint.name, endpoint.target_port),
                None => println!("  - {} :{}", endpoint.name, endpoint.target_port),
            }
        }
    }

    let pre_stop = descriptor.pre_stop_commands();
    if !pre_stop.is_empty() {
        println!();
        println!("pre-stop:");
        for command in pre_stop {
            println!("  - {}", command.id);
        }
    }

    debug!("dry-run complete (no execution)");
}
