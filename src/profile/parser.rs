//! Profile file parsing and lookup

use super::{Profile, Rule};
use crate::error::SparseError;
use crate::system::System;
use crate::utils::NormalizedPath;
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extension every profile carries
pub const PROFILE_EXTENSION: &str = ".conf";

/// Parse profile text into ordered include and exclude rules
///
/// Everything from the first `#` on a line is a comment. After trimming, a
/// line starting with `-` is an exclude and one starting with `+` is an
/// include; any other non-blank line is ignored.
///
/// # Errors
///
/// Returns an error if a rule path names the repository root or contains `..`
pub fn parse_profile(content: &str) -> Result<Profile> {
    let mut profile = Profile::default();

    for (index, raw_line) in content.lines().enumerate() {
        let line = strip_comment(raw_line).trim();
        let (is_include, raw_path) = if let Some(rest) = line.strip_prefix('-') {
            (false, rest.trim())
        } else if let Some(rest) = line.strip_prefix('+') {
            (true, rest.trim())
        } else {
            if !line.is_empty() {
                debug!("Ignoring profile line {}: {line}", index + 1);
            }
            continue;
        };

        let path = NormalizedPath::parse(raw_path)
            .with_context(|| format!("Invalid rule on profile line {}", index + 1))?;
        if path.is_root() {
            return Err(SparseError::configuration(format!(
                "Rule on profile line {} must name a path below the repository root: '{line}'",
                index + 1
            ))
            .into());
        }

        if is_include {
            profile.inclusions.push(Rule::include(path));
        } else {
            profile.exclusions.push(Rule::exclude(path));
        }
    }

    Ok(profile)
}

/// Read and parse a profile file
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read, or any error
/// from [`parse_profile`]
pub fn load_profile(system: &dyn System, path: &Path) -> Result<Profile> {
    let content = system.read_to_string(path).map_err(|e| {
        SparseError::configuration(format!(
            "Failed to read profile {}: {e}",
            path.display()
        ))
    })?;

    let profile = parse_profile(&content)
        .with_context(|| format!("Failed to parse profile {}", path.display()))?;

    debug!(
        "Loaded profile {}: {} inclusions, {} exclusions",
        path.display(),
        profile.inclusions.len(),
        profile.exclusions.len()
    );
    Ok(profile)
}

/// Locate a profile by name
///
/// The name gets a `.conf` suffix when it has none, then is looked up as a
/// path (relative to the current directory), inside `profile_dir`, and
/// finally inside `<user config dir>/svn-sparse/profiles`.
///
/// # Errors
///
/// Returns a configuration error if no candidate file exists
pub fn resolve_profile_path(
    system: &dyn System,
    name: &str,
    profile_dir: Option<&Path>,
) -> Result<PathBuf> {
    if name.trim().is_empty() {
        return Err(SparseError::configuration("Profile name cannot be empty").into());
    }

    let file_name = if name.contains(PROFILE_EXTENSION) {
        name.to_owned()
    } else {
        format!("{name}{PROFILE_EXTENSION}")
    };

    let mut candidates = Vec::new();
    let direct = PathBuf::from(&file_name);
    if direct.is_absolute() {
        candidates.push(direct);
    } else {
        let cwd = system.current_dir().map_err(|e| {
            SparseError::filesystem(format!("Cannot get current directory: {e}"))
        })?;
        candidates.push(cwd.join(&direct));
        if let Some(dir) = profile_dir {
            candidates.push(dir.join(&direct));
        }
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("svn-sparse").join("profiles").join(&direct));
        }
    }

    for candidate in &candidates {
        if system.is_file(candidate) {
            debug!("Resolved profile '{name}' to {}", candidate.display());
            return Ok(candidate.clone());
        }
    }

    let searched: Vec<String> = candidates
        .iter()
        .map(|c| format!("  - {}", c.display()))
        .collect();
    Err(SparseError::configuration(format!(
        "Profile not found: {file_name}\nSearched:\n{}",
        searched.join("\n")
    ))
    .into())
}

fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(rule, _)| rule)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    fn paths(rules: &[Rule]) -> Vec<String> {
        rules.iter().map(|r| r.path.to_string()).collect()
    }

    #[test]
    fn test_parse_rules_in_file_order() {
        let profile = parse_profile(
            "# client profile\n\
             -/vendor/legacy\n\
             +/vendor/legacy/core   # keep the core\n\
             \n\
             - tools/win32\n\
             +docs\n",
        )
        .unwrap();

        assert_eq!(paths(&profile.exclusions), vec!["/vendor/legacy", "/tools/win32"]);
        assert_eq!(paths(&profile.inclusions), vec!["/vendor/legacy/core", "/docs"]);
    }

    #[test]
    fn test_unprefixed_lines_are_ignored() {
        let profile = parse_profile("vendor/legacy\n  \n*glob\n-/build\n").unwrap();
        assert!(profile.inclusions.is_empty());
        assert_eq!(paths(&profile.exclusions), vec!["/build"]);
    }

    #[test]
    fn test_comment_only_rule_is_blank() {
        let profile = parse_profile("#-/build\n   # +/src\n").unwrap();
        assert!(profile.is_empty());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let profile = parse_profile("-/a\n-/a\n").unwrap();
        assert_eq!(profile.exclusions.len(), 2);
    }

    #[test]
    fn test_root_rule_is_rejected() {
        let err = parse_profile("-/\n").unwrap_err();
        let kind = err.downcast_ref::<SparseError>().map(SparseError::exit_code);
        assert_eq!(kind, Some(1));
        assert!(parse_profile("+\n").is_err());
    }

    #[test]
    fn test_parent_segments_are_rejected() {
        assert!(parse_profile("+/a/../b\n").is_err());
    }

    #[test]
    fn test_planning_order_puts_includes_first() {
        let profile = parse_profile("-/x\n+/y\n-/z\n+/w\n").unwrap();
        let order: Vec<String> = profile.planning_order().map(ToString::to_string).collect();
        assert_eq!(order, vec!["+/y", "+/w", "-/x", "-/z"]);
    }

    #[test]
    fn test_has_exclusion_under() {
        let profile = parse_profile("+/a/b\n-/a/b/c\n").unwrap();
        assert!(profile.has_exclusion_under(&NormalizedPath::parse("/a/b").unwrap()));
        assert!(!profile.has_exclusion_under(&NormalizedPath::parse("/a/b/c").unwrap()));
    }

    #[test]
    fn test_load_missing_profile_is_configuration_error() {
        let system = MockSystem::new();
        let err = load_profile(&system, Path::new("/profiles/none.conf")).unwrap_err();
        let kind = err.downcast_ref::<SparseError>().map(SparseError::exit_code);
        assert_eq!(kind, Some(1));
    }

    #[test]
    fn test_resolve_appends_extension() {
        let system = MockSystem::new()
            .with_current_dir("/work")
            .unwrap()
            .with_file("/work/client.conf", b"-/build\n")
            .unwrap();
        let path = resolve_profile_path(&system, "client", None).unwrap();
        assert_eq!(path, PathBuf::from("/work/client.conf"));
    }

    #[test]
    fn test_resolve_searches_profile_dir() {
        let system = MockSystem::new()
            .with_current_dir("/work")
            .unwrap()
            .with_file("/etc/profiles/server.conf", b"-/client\n")
            .unwrap();
        let path =
            resolve_profile_path(&system, "server.conf", Some(Path::new("/etc/profiles"))).unwrap();
        assert_eq!(path, PathBuf::from("/etc/profiles/server.conf"));
    }

    #[test]
    fn test_resolve_missing_profile_lists_candidates() {
        let system = MockSystem::new().with_current_dir("/work").unwrap();
        let err = resolve_profile_path(&system, "ghost", None).unwrap_err();
        assert!(err.to_string().contains("Profile not found: ghost.conf"));
    }
}
