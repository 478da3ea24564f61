// src/engine/start.rs

//! One-shot entry point: push the whole tree once and (re)start the
//! configured command. No registry, no watching, no cleanup.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::config::Descriptor;
use crate::engine::WatchParameters;
use crate::errors::Result;
use crate::exec::ShellExecutor;
use crate::fs::RealFileSystem;
use crate::push::{PushParameters, SyncHandler, SyncTarget};
use crate::types::RunMode;
use crate::watch::IgnoreList;

/// Push `path` to `target` once using the shell executor and the real
/// filesystem. The first fatal error is returned.
pub async fn start(
    descriptor: Arc<Descriptor>,
    target: SyncTarget,
    ignore: IgnoreList,
    path: PathBuf,
    mode: RunMode,
) -> Result<()> {
    let ignore = target.exclude_from(ignore)?;
    let executor = Arc::new(ShellExecutor::new(target.exec.clone()));
    let handler = SyncHandler::new(Arc::new(RealFileSystem), executor, target, &path)?;

    let params = WatchParameters::new(&path, descriptor, Arc::new(handler))
        .with_ignore(ignore)
        .with_run_mode(mode);
    start_with_handler(&params).await
}

/// Perform exactly one full push through `params.handler`. The handler's
/// error is returned unchanged.
pub async fn start_with_handler(params: &WatchParameters) -> Result<()> {
    info!(
        root = ?params.root,
        mode = %params.run_mode,
        component = %params.descriptor.name(),
        "starting one-shot push"
    );
    params.out.line(format!(
        "Pushing {} to the target ({} mode)",
        params.root.display(),
        params.run_mode
    ));

    params
        .handler
        .regenerate_and_push(PushParameters::full(params), params)
        .await?;

    params.out.line("Push complete");
    Ok(())
}
