//! Plan executor tests: ordering, failure, cancellation and progress events

use std::path::{Path, PathBuf};
use svn_sparse::cancel::CancellationToken;
use svn_sparse::error::SparseError;
use svn_sparse::remote::{Depth, MockRemote, RemoteCall, Revision};
use svn_sparse::sparse::{EventKind, ExecutionMode, Executor, Plan, ProgressEvent};
use svn_sparse::system::{MockSystem, System as _};
use svn_sparse::utils::NormalizedPath;

const URL: &str = "svn://mock/trunk";

fn path(raw: &str) -> NormalizedPath {
    NormalizedPath::parse(raw).unwrap()
}

fn repository() -> (MockSystem, MockRemote) {
    let system = MockSystem::new();
    let remote = MockRemote::new(system.clone(), URL)
        .with_file("/docs/guide.md", b"guide")
        .unwrap()
        .with_file("/src/lib.c", b"lib")
        .unwrap()
        .with_file("/src/util/str.c", b"str")
        .unwrap();
    (system, remote)
}

fn plan(infinite: &[&str]) -> Plan {
    let mut plan = Plan::new(Revision(8));
    plan.create_root = true;
    plan.infinite = infinite.iter().map(|p| path(p)).collect();
    plan
}

#[test]
fn test_failure_stops_remaining_operations() {
    let (_system, remote) = repository();
    let executor = Executor::new(&remote, URL, Path::new("/wc"), CancellationToken::new());

    let err = executor
        .execute(&plan(&["/missing", "/docs"]), None)
        .unwrap_err();

    assert_eq!(err.downcast_ref::<SparseError>().unwrap().exit_code(), 2);
    assert_eq!(
        remote.mutating_calls(),
        vec![
            RemoteCall::Checkout {
                dest: PathBuf::from("/wc"),
                depth: Depth::Empty,
                revision: Revision(8),
            },
            RemoteCall::Update {
                path: PathBuf::from("/wc/missing"),
                depth: Depth::Infinity,
                revision: Revision(8),
            },
        ]
    );
}

#[test]
fn test_cancellation_between_operations() {
    let (_system, remote) = repository();
    let cancel = CancellationToken::new();
    let executor = Executor::new(&remote, URL, Path::new("/wc"), cancel.clone());

    let mut observer = |event: &ProgressEvent| {
        if event.path.starts_with("docs") {
            cancel.cancel();
        }
    };
    let err = executor
        .execute(&plan(&["/docs", "/src"]), Some(&mut observer))
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<SparseError>(),
        Some(SparseError::Cancelled)
    ));
    assert_eq!(err.downcast_ref::<SparseError>().unwrap().exit_code(), 130);
    // root checkout and /docs ran, /src never started
    assert_eq!(remote.mutating_calls().len(), 2);
}

#[test]
fn test_progress_events_are_relative_and_filtered() {
    let (_system, remote) = repository();
    let executor = Executor::new(&remote, URL, Path::new("/wc"), CancellationToken::new());

    let mut events = Vec::new();
    let mut observer = |event: &ProgressEvent| events.push(event.clone());
    let summary = executor
        .execute(&plan(&["/src"]), Some(&mut observer))
        .unwrap();

    let paths: Vec<&str> = events.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["src", "src/util", "src/lib.c", "src/util/str.c"]);
    assert!(events.iter().all(|e| e.kind == EventKind::Add));
    assert_eq!(summary.events, 4);
    assert_eq!(summary.operations, 2);
}

#[test]
fn test_dry_run_issues_no_calls() {
    let (system, remote) = repository();
    let executor = Executor::new(&remote, URL, Path::new("/wc"), CancellationToken::new())
        .with_mode(ExecutionMode::DryRun);

    let summary = executor.execute(&plan(&["/docs", "/src"]), None).unwrap();

    assert_eq!(summary.operations, 3);
    assert!(remote.calls().is_empty());
    assert!(!system.exists(Path::new("/wc")));
}
