// src/engine/dispatcher.rs

use tracing::{debug, info};

use crate::engine::WatchParameters;
use crate::errors::Result;
use crate::push::PushParameters;
use crate::types::BoxFuture;
use crate::watch::ChangeSet;

/// Pushes one change set to the target.
///
/// The controller awaits each dispatch before reading the next burst, so
/// implementations never see two calls in flight for the same session.
pub trait Dispatcher: Send {
    fn dispatch<'a>(
        &'a mut self,
        changes: &'a ChangeSet,
        params: &'a WatchParameters,
    ) -> BoxFuture<'a, Result<()>>;
}

/// Production dispatcher: reports progress on the output sink and hands the
/// change set to the session's push handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct PushDispatcher;

impl Dispatcher for PushDispatcher {
    fn dispatch<'a>(
        &'a mut self,
        changes: &'a ChangeSet,
        params: &'a WatchParameters,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            for path in changes.changed() {
                debug!(?path, "changed");
            }
            for path in changes.deleted() {
                debug!(?path, "deleted");
            }

            params.out.line(format!(
                "File changes detected ({} changed, {} deleted); pushing files...",
                changes.changed().len(),
                changes.deleted().len()
            ));

            let push = PushParameters::from_changes(changes, params);
            params.handler.regenerate_and_push(push, params).await?;

            info!(paths = changes.len(), "change set pushed");
            params.out.line("Changes pushed; watching for further changes");
            Ok(())
        })
    }
}
