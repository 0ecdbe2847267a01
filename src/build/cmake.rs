//! `BWConfiguration_*.cmake` discovery and parsing

use super::{BuildConfiguration, Project, normalize_project_path};
use crate::error::SparseError;
use crate::system::System;
use anyhow::{Context as _, Result};
use regex::Regex;
use std::path::Path;
use tracing::debug;

/// Location of the configuration files relative to the build root
pub const CONFIGURATION_DIR: &str = "programming/bigworld_client/build/cmake";

const PROJECT_BLOCKS: [&str; 2] = ["BW_LIBRARY_PROJECTS", "BW_BINARY_PROJECTS"];

/// Find and parse every build configuration
///
/// Configurations are read from `config_dir` when given, otherwise from
/// [`CONFIGURATION_DIR`] under `root`, and returned sorted by name.
///
/// # Errors
///
/// Returns a configuration error if the directory is missing or a
/// configuration file cannot be read or parsed
pub fn discover_configurations(
    system: &dyn System,
    root: &Path,
    config_dir: Option<&Path>,
) -> Result<Vec<BuildConfiguration>> {
    let dir = config_dir.map_or_else(|| root.join(CONFIGURATION_DIR), Path::to_path_buf);
    if !system.is_dir(&dir) {
        return Err(SparseError::configuration(format!(
            "Build configuration directory not found: {}",
            dir.display()
        ))
        .into());
    }

    let file_pattern = Regex::new(r"^BWConfiguration_(.+)\.cmake$")?;
    let entries = system.read_dir(&dir).map_err(|e| {
        SparseError::configuration(format!("Failed to read {}: {e}", dir.display()))
    })?;

    let mut configs = Vec::new();
    for entry in entries {
        let Some(file_name) = entry.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(captures) = file_pattern.captures(file_name) else {
            continue;
        };
        if !system.is_file(&entry) {
            continue;
        }

        let name = captures[1].to_owned();
        let content = system.read_to_string(&entry).map_err(|e| {
            SparseError::configuration(format!("Failed to read {}: {e}", entry.display()))
        })?;
        let projects = parse_configuration(&content)
            .with_context(|| format!("Failed to parse {}", entry.display()))?;
        debug!("Configuration {name}: {} projects", projects.len());

        configs.push(BuildConfiguration {
            name,
            source: entry,
            projects,
        });
    }

    configs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(configs)
}

/// Extract the declared projects from a configuration file
///
/// Every `BW_LIBRARY_PROJECTS` and `BW_BINARY_PROJECTS` block up to the next
/// `)` is read one entry per line as `[name] path`. Text after `#` is a
/// comment; lines not starting with a path-like token (variable references,
/// keywords) are skipped.
///
/// # Errors
///
/// Returns a configuration error if a project block is never closed
pub fn parse_configuration(content: &str) -> Result<Vec<Project>> {
    // `${KEYWORD}` is a reference to the list, not the start of a block
    let keyword = Regex::new(&format!(r"(\$\{{)?\b({})\b", PROJECT_BLOCKS.join("|")))?;
    let starts: Vec<(usize, usize, &str)> = keyword
        .captures_iter(content)
        .filter(|captures| captures.get(1).is_none())
        .filter_map(|captures| captures.get(2))
        .map(|found| (found.start(), found.end(), found.as_str()))
        .collect();

    // Each block must close before the next one opens
    let mut blocks = Vec::with_capacity(starts.len());
    for (index, &(_, body_start, name)) in starts.iter().enumerate() {
        let body_end = starts
            .get(index + 1)
            .map_or(content.len(), |&(next_start, _, _)| next_start);
        let body = &content[body_start..body_end];
        let Some(close) = body.find(')') else {
            return Err(SparseError::configuration(format!("Unterminated {name} block")).into());
        };
        blocks.push((name, &body[..close]));
    }

    let mut projects = Vec::new();
    for keyword in PROJECT_BLOCKS {
        for (_, body) in blocks.iter().filter(|(name, _)| *name == keyword) {
            projects.extend(body.lines().filter_map(parse_project_line));
        }
    }

    Ok(projects)
}

fn parse_project_line(line: &str) -> Option<Project> {
    let line = line.split('#').next().unwrap_or_default();
    let mut tokens = line.split_whitespace().take_while(|t| is_path_token(t));

    let first = tokens.next()?;
    let (name, path) = match tokens.next() {
        Some(path) => (first.to_owned(), normalize_project_path(path)),
        None => {
            let path = normalize_project_path(first);
            let name = path.rsplit('/').next().unwrap_or(&path).to_owned();
            (name, path)
        }
    };

    (!path.is_empty()).then_some(Project { name, path })
}

fn is_path_token(token: &str) -> bool {
    token
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '\\'))
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    const SERVER: &str = r"
SET( BW_LIBRARY_PROJECTS ${BW_LIBRARY_PROJECTS}
    cstdmf      lib/cstdmf
    math        lib\math     # vectors
    # network   lib/network
)

SET( BW_BINARY_PROJECTS
    ./server/baseapp
)
";

    #[test]
    fn test_parse_library_and_binary_blocks() {
        let projects = parse_configuration(SERVER).unwrap();
        assert_eq!(
            projects,
            vec![
                Project {
                    name: "cstdmf".to_owned(),
                    path: "lib/cstdmf".to_owned()
                },
                Project {
                    name: "math".to_owned(),
                    path: "lib/math".to_owned()
                },
                Project {
                    name: "baseapp".to_owned(),
                    path: "server/baseapp".to_owned()
                },
            ]
        );
    }

    #[test]
    fn test_unterminated_block_is_rejected() {
        let err = parse_configuration("SET( BW_BINARY_PROJECTS\n  client\n").unwrap_err();
        assert!(err.to_string().contains("Unterminated BW_BINARY_PROJECTS"));
    }

    #[test]
    fn test_unclosed_block_before_closed_block_is_rejected() {
        let content = "\
SET( BW_LIBRARY_PROJECTS
    cstdmf  lib/cstdmf

SET( BW_BINARY_PROJECTS
    client  client/app
)
";
        let err = parse_configuration(content).unwrap_err();
        assert!(err.to_string().contains("Unterminated BW_LIBRARY_PROJECTS"));
    }

    #[test]
    fn test_repeated_keyword_blocks_are_checked_separately() {
        let content = "\
SET( BW_BINARY_PROJECTS
    tools  tools/editor
SET( BW_BINARY_PROJECTS ${BW_BINARY_PROJECTS}
    client  client/app
)
";
        let err = parse_configuration(content).unwrap_err();
        assert!(err.to_string().contains("Unterminated BW_BINARY_PROJECTS"));

        let closed = content.replacen("tools/editor\n", "tools/editor\n)\n", 1);
        let names: Vec<String> = parse_configuration(&closed)
            .unwrap()
            .into_iter()
            .map(|project| project.name)
            .collect();
        assert_eq!(names, vec!["tools", "client"]);
    }

    #[test]
    fn test_file_without_blocks_has_no_projects() {
        assert!(parse_configuration("SET( OTHER foo )").unwrap().is_empty());
    }

    #[test]
    fn test_discover_sorts_by_name_and_ignores_other_files() {
        let dir = format!("/src/{CONFIGURATION_DIR}");
        let system = MockSystem::new()
            .with_file(format!("{dir}/BWConfiguration_server.cmake"), SERVER.as_bytes())
            .unwrap()
            .with_file(
                format!("{dir}/BWConfiguration_client.cmake"),
                b"SET( BW_BINARY_PROJECTS\n client\n)\n",
            )
            .unwrap()
            .with_file(format!("{dir}/CMakeLists.txt"), b"project(x)")
            .unwrap();

        let configs = discover_configurations(&system, Path::new("/src"), None).unwrap();
        let names: Vec<&str> = configs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["client", "server"]);
        assert_eq!(configs[1].projects.len(), 3);
    }

    #[test]
    fn test_missing_directory_is_configuration_error() {
        let system = MockSystem::new();
        let err = discover_configurations(&system, Path::new("/src"), None).unwrap_err();
        assert_eq!(err.downcast_ref::<SparseError>().unwrap().exit_code(), 1);
    }
}
