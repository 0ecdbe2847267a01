//! Build configuration staleness checking
//!
//! A build tree declares one or more configurations, each listing the source
//! directories of the projects it builds. Given the paths touched by a sparse
//! checkout (or any other change set), a configuration is stale when any
//! changed path lies inside one of its project directories.

pub mod cmake;

pub use cmake::{CONFIGURATION_DIR, discover_configurations, parse_configuration};

use crate::utils::path::normalize_separators;
use serde::Serialize;
use std::path::PathBuf;

/// A project declared by a build configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub name: String,
    /// Source directory, forward slashes, no leading `./`
    pub path: String,
}

/// One `BWConfiguration_<name>.cmake` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    pub name: String,
    pub source: PathBuf,
    pub projects: Vec<Project>,
}

/// Verdict for one configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StalenessReport {
    pub configuration: String,
    pub stale: bool,
    /// Changed paths that made the configuration stale
    pub triggers: Vec<String>,
}

/// Normalize a path for prefix comparison
#[must_use]
pub fn normalize_project_path(path: &str) -> String {
    let path = normalize_separators(path.trim());
    let path = path.strip_prefix("./").unwrap_or(&path);
    path.trim_start_matches('/').to_owned()
}

/// Parse a change list: one path per line, blank lines and `#` comments ignored
#[must_use]
pub fn parse_changed_paths(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(normalize_project_path)
        .collect()
}

/// Check every configuration against the changed paths
///
/// Reports come back sorted by configuration name.
#[must_use]
pub fn check_staleness(configs: &[BuildConfiguration], changed: &[String]) -> Vec<StalenessReport> {
    let changed: Vec<String> = changed.iter().map(|p| normalize_project_path(p)).collect();

    let mut reports: Vec<StalenessReport> = configs
        .iter()
        .map(|config| {
            let triggers: Vec<String> = changed
                .iter()
                .filter(|path| {
                    config
                        .projects
                        .iter()
                        .any(|project| path.starts_with(&project.path))
                })
                .cloned()
                .collect();
            StalenessReport {
                configuration: config.name.clone(),
                stale: !triggers.is_empty(),
                triggers,
            }
        })
        .collect();

    reports.sort_by(|a, b| a.configuration.cmp(&b.configuration));
    reports
}
