//! YAML settings loading and parsing

use crate::config::Settings;
use crate::error::SparseError;
use crate::system::System;
use anyhow::Result;
use std::path::Path;
use tracing::debug;

/// Load and parse YAML settings from file
///
/// # Errors
///
/// Returns a configuration error if an explicitly named file is missing, the
/// file cannot be read or parsed, or the settings fail validation
pub fn load_settings(system: &dyn System, path: &str, explicit: bool) -> Result<Settings> {
    let path_obj = Path::new(path);

    if !system.exists(path_obj) {
        if explicit {
            return Err(SparseError::configuration(format!(
                "Settings file not found: {path}"
            ))
            .into());
        }
        debug!("No settings file at {path}, using defaults");
        return Ok(Settings::default());
    }

    let content = system.read_to_string(path_obj).map_err(|e| {
        SparseError::configuration(format!("Failed to read settings file {path}: {e}"))
    })?;

    let settings = parse_settings(&content).map_err(|e| {
        SparseError::configuration(format!(
            "Failed to parse YAML settings in file: {path}\n{e}"
        ))
    })?;

    settings.validate()?;
    debug!("Loaded settings from {path}: {settings:?}");
    Ok(settings)
}

/// Parse settings text; an empty document yields the defaults
///
/// # Errors
///
/// Returns the YAML error for malformed input or unknown keys
pub fn parse_settings(content: &str) -> Result<Settings, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(content)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;
    use crate::system::MockSystem;
    use std::path::PathBuf;

    #[test]
    fn test_missing_default_file_uses_defaults() {
        let system = MockSystem::new();
        let settings = load_settings(&system, "./svn-sparse.yaml", false).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.svn, "svn");
    }

    #[test]
    fn test_missing_explicit_file_is_configuration_error() {
        let system = MockSystem::new();
        let err = load_settings(&system, "/etc/missing.yaml", true).unwrap_err();
        let sparse = err.downcast_ref::<SparseError>().unwrap();
        assert_eq!(sparse.exit_code(), 1);
        assert!(err.to_string().contains("Settings file not found"));
    }

    #[test]
    fn test_load_all_fields() {
        let system = MockSystem::new()
            .with_file(
                "/cfg/settings.yaml",
                b"svn: /opt/svn/bin/svn\nprofile_dir: /cfg/profiles\nreset_excluded: true\n",
            )
            .unwrap();
        let settings = load_settings(&system, "/cfg/settings.yaml", true).unwrap();
        assert_eq!(settings.svn, "/opt/svn/bin/svn");
        assert_eq!(settings.profile_dir, Some(PathBuf::from("/cfg/profiles")));
        assert!(settings.reset_excluded);
        assert_eq!(settings.build_config_dir, None);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let system = MockSystem::new()
            .with_file("/cfg/settings.yaml", b"svn: svn\nrepository: foo\n")
            .unwrap();
        let err = load_settings(&system, "/cfg/settings.yaml", true).unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML settings"));
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(parse_settings("\n").unwrap(), Settings::default());
    }
}
