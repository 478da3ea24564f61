#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use devloop::config::Descriptor;
use devloop::engine::WatchParameters;
use devloop::fs::mock::MockFileSystem;
use devloop::push::PushHandler;
use devloop::watch::IgnoreList;

pub use devloop_test_utils::builders::{CommandBuilder, ConfigFileBuilder, simple_descriptor};
pub use devloop_test_utils::fakes::{
    FakeBackend, FakeCleanup, FakeDispatcher, FakePushHandler, RecordingExecutor,
};
pub use devloop_test_utils::{SharedBuffer, init_tracing, with_timeout};

/// Root used by every mock-filesystem test.
pub const ROOT: &str = "/project";

pub fn root() -> PathBuf {
    PathBuf::from(ROOT)
}

pub fn p(rel: &str) -> PathBuf {
    root().join(rel)
}

/// A mock tree with `src/`, `src/nested/`, `node_modules/dep/` and a few
/// files.
pub fn sample_tree() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file(p("README.md"), "# demo");
    fs.add_file(p("src/main.rs"), "fn main() {}");
    fs.add_file(p("src/nested/util.rs"), "pub fn util() {}");
    fs.add_file(p("node_modules/dep/index.js"), "module.exports = {}");
    fs
}

pub fn ignore(patterns: &[&str]) -> IgnoreList {
    IgnoreList::new(ROOT, patterns).expect("valid ignore patterns")
}

/// Watch parameters over `root` writing into `out`.
pub fn params_with(
    root: &Path,
    descriptor: Descriptor,
    handler: Arc<dyn PushHandler>,
    out: &SharedBuffer,
) -> WatchParameters {
    WatchParameters::new(root, Arc::new(descriptor), handler).with_output(out.sink())
}
