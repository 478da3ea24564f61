// tests/ignore_and_events.rs

mod common;
use crate::common::{ignore, p};

use std::path::{Path, PathBuf};

use notify::event::{
    AccessKind, CreateKind, DataChange, EventKind as NotifyKind, MetadataKind, ModifyKind,
    RemoveKind, RenameMode,
};

use devloop::watch::event::raw_events_with;
use devloop::watch::{EventKind, IgnoreList, RawEvent};

#[test]
fn plain_patterns_match_exact_or_below() {
    let list = ignore(&["build", "/project/docs/api.md"]);

    assert!(list.matches(&p("build")));
    assert!(list.matches(&p("build/out/app.o")));
    assert!(!list.matches(&p("builder.rs")));
    assert!(!list.matches(&p("src/build")));
    assert!(list.matches(&p("docs/api.md")));
    assert!(!list.matches(&p("docs/api.md.bak")));
}

#[test]
fn matching_is_case_sensitive() {
    let list = ignore(&["Build"]);

    assert!(list.matches(&p("Build/x")));
    assert!(!list.matches(&p("build/x")));
}

#[test]
fn relative_inputs_and_dot_segments_are_normalised() {
    let list = ignore(&["./gen/../target"]);

    assert!(list.matches(Path::new("target/debug")));
    assert!(list.matches(&p("src/../target")));
    assert!(!list.matches(&p("gen")));
}

#[test]
fn glob_patterns_match_relative_paths() {
    let list = ignore(&["*.log", "**/tmp/**"]);

    assert!(list.matches(&p("server.log")));
    assert!(list.matches(&p("logs/server.log")));
    assert!(list.matches(&p("a/tmp/b.txt")));
    assert!(!list.matches(&p("server.rs")));
}

#[test]
fn state_dir_is_always_ignored_and_root_is_not() {
    let list = IgnoreList::empty("/project");

    assert!(list.matches(&p(".devloop")));
    assert!(list.matches(&p(".devloop/remote/src/main.rs")));
    assert!(!list.matches(&p("src/main.rs")));
    assert!(!list.matches(Path::new("/project")));
    assert!(list.patterns().is_empty());
}

#[test]
fn excluded_dir_inside_root_is_ignored_with_its_subtree() {
    let list = IgnoreList::empty("/project")
        .with_excluded_dir(Path::new("build/remote"))
        .with_excluded_dir(Path::new("/srv/mirror"))
        .with_excluded_dir(Path::new("/project"));

    assert!(list.matches(&p("build/remote")));
    assert!(list.matches(&p("build/remote/src/main.rs")));
    assert!(!list.matches(&p("build/out.o")));
    assert!(!list.matches(&p("src/main.rs")));
    assert!(!list.matches(Path::new("/srv/mirror/src/main.rs")));
    assert!(list.patterns().is_empty());
}

#[test]
fn blank_patterns_are_dropped_and_bad_globs_rejected() {
    let list = ignore(&["", "  ", "target"]);
    assert_eq!(list.patterns(), &["target".to_string()]);

    assert!(IgnoreList::new("/project", &["src/[broken"]).is_err());
}

fn event(kind: NotifyKind, paths: &[&str]) -> notify::Event {
    paths
        .iter()
        .fold(notify::Event::new(kind), |ev, rel| ev.add_path(p(rel)))
}

fn kinds(events: &[RawEvent]) -> Vec<(PathBuf, EventKind)> {
    events.iter().map(|e| (e.path.clone(), e.kind)).collect()
}

#[test]
fn create_remove_and_modify_map_directly() {
    let never = |_: &Path| false;

    let created = raw_events_with(event(NotifyKind::Create(CreateKind::File), &["a"]), never);
    assert_eq!(created, vec![RawEvent::create(p("a"))]);

    let removed = raw_events_with(event(NotifyKind::Remove(RemoveKind::Folder), &["d"]), never);
    assert_eq!(removed, vec![RawEvent::remove(p("d"))]);

    let written = raw_events_with(
        event(NotifyKind::Modify(ModifyKind::Data(DataChange::Content)), &["a", "b"]),
        never,
    );
    assert_eq!(written, vec![RawEvent::write(p("a")), RawEvent::write(p("b"))]);

    let chmod = raw_events_with(
        event(NotifyKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)), &["a"]),
        never,
    );
    assert_eq!(chmod, vec![RawEvent::write(p("a"))]);
}

#[test]
fn access_events_are_dropped() {
    let events = raw_events_with(
        event(NotifyKind::Access(AccessKind::Read), &["a"]),
        |_: &Path| true,
    );
    assert!(events.is_empty());
}

#[test]
fn directed_renames_split_into_rename_and_create() {
    let never = |_: &Path| false;

    let from = raw_events_with(
        event(NotifyKind::Modify(ModifyKind::Name(RenameMode::From)), &["old"]),
        never,
    );
    assert_eq!(from, vec![RawEvent::rename(p("old"))]);

    let to = raw_events_with(
        event(NotifyKind::Modify(ModifyKind::Name(RenameMode::To)), &["new"]),
        never,
    );
    assert_eq!(to, vec![RawEvent::create(p("new"))]);

    let both = raw_events_with(
        event(NotifyKind::Modify(ModifyKind::Name(RenameMode::Both)), &["old", "new"]),
        never,
    );
    assert_eq!(
        kinds(&both),
        vec![(p("old"), EventKind::Rename), (p("new"), EventKind::Create)]
    );
}

#[test]
fn undirected_rename_consults_the_disk() {
    let exists = |path: &Path| path.ends_with("new");
    let events = raw_events_with(
        event(NotifyKind::Modify(ModifyKind::Name(RenameMode::Any)), &["old", "new"]),
        exists,
    );

    assert_eq!(
        kinds(&events),
        vec![(p("old"), EventKind::Rename), (p("new"), EventKind::Create)]
    );
}

#[test]
fn removal_kinds_are_flagged() {
    assert!(EventKind::Remove.is_removal());
    assert!(EventKind::Rename.is_removal());
    assert!(!EventKind::Create.is_removal());
    assert!(!EventKind::Write.is_removal());
}
