use std::fmt;
use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::Deserialize;

/// Boxed future returned by the pluggable capabilities (push handler,
/// dispatcher, cleanup runner, command executor).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Which long-lived command is started after a successful sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Run,
    Debug,
}

impl RunMode {
    pub fn from_debug_flag(debug: bool) -> Self {
        if debug { RunMode::Debug } else { RunMode::Run }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Run => "run",
            RunMode::Debug => "debug",
        }
    }
}

impl Default for RunMode {
    fn default() -> Self {
        RunMode::Run
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "run" => Ok(RunMode::Run),
            "debug" => Ok(RunMode::Debug),
            other => Err(format!(
                "invalid run mode: {other} (expected \"run\" or \"debug\")"
            )),
        }
    }
}

/// Destination for human-readable progress text.
///
/// Cloneable so the dispatcher, the push handler and the cleanup runner can
/// all report to the same writer. The lock is only held for a single write,
/// never across an `.await`.
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl OutputSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Sink that drops everything written to it.
    pub fn discard() -> Self {
        Self::new(std::io::sink())
    }

    /// Write `text` verbatim.
    pub fn write_str(&self, text: &str) {
        let mut guard = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let res = guard.write_all(text.as_bytes());
        if let Err(err) = res.and_then(|_| guard.flush()) {
            tracing::warn!(error = %err, "failed to write to output sink");
        }
    }

    /// Write `msg` followed by a newline.
    pub fn line(&self, msg: impl fmt::Display) {
        self.write_str(&format!("{msg}\n"));
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

/// Where the synced-file index is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStorageMode {
    /// Persist under `<root>/.devloop/file-index` so a later `--once` run
    /// only pushes what changed since the previous session.
    File,
    /// Keep the index in memory only (lost on restart).
    Memory,
}

impl Default for IndexStorageMode {
    fn default() -> Self {
        IndexStorageMode::File
    }
}
