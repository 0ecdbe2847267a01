//! Profile lookup and loading against the real filesystem

use std::fs;
use svn_sparse::error::SparseError;
use svn_sparse::profile::{RuleKind, load_profile, resolve_profile_path};
use svn_sparse::system::RealSystem;
use tempfile::TempDir;

const CLIENT_PROFILE: &str = "\
# client-only checkout
-/programming/bigworld/server   # not needed on client machines
-/programming/bigworld/tools
+/programming/bigworld/tools/shared

not a rule, ignored
";

#[test]
fn test_resolve_in_profile_dir_and_load() {
    let temp_dir = TempDir::new().unwrap();
    let profiles = temp_dir.path().join("profiles");
    fs::create_dir_all(&profiles).unwrap();
    fs::write(profiles.join("client.conf"), CLIENT_PROFILE).unwrap();

    let system = RealSystem::new();
    let path = resolve_profile_path(&system, "client", Some(&profiles)).unwrap();
    assert_eq!(path, profiles.join("client.conf"));

    let profile = load_profile(&system, &path).unwrap();
    assert_eq!(profile.exclusions.len(), 2);
    assert_eq!(profile.inclusions.len(), 1);

    let order: Vec<String> = profile.planning_order().map(ToString::to_string).collect();
    assert_eq!(
        order,
        vec![
            "+/programming/bigworld/tools/shared",
            "-/programming/bigworld/server",
            "-/programming/bigworld/tools",
        ]
    );
    assert_eq!(profile.exclusions[0].kind, RuleKind::Exclude);
}

#[test]
fn test_absolute_profile_path_with_extension() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("server.conf");
    fs::write(&file, "-/client\n").unwrap();

    let system = RealSystem::new();
    let resolved = resolve_profile_path(&system, file.to_str().unwrap(), None).unwrap();
    assert_eq!(resolved, file);
}

#[test]
fn test_profile_with_parent_segment_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("bad.conf");
    fs::write(&file, "-/src/../../etc\n").unwrap();

    let err = load_profile(&RealSystem::new(), &file).unwrap_err();
    assert_eq!(err.downcast_ref::<SparseError>().unwrap().exit_code(), 1);
}

#[test]
fn test_unreadable_profile_is_configuration_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = load_profile(&RealSystem::new(), &temp_dir.path().join("gone.conf")).unwrap_err();
    let sparse = err.downcast_ref::<SparseError>().unwrap();
    assert!(matches!(sparse, SparseError::Configuration { .. }));
}
