//! Configuration management module
//!
//! Handles the optional YAML settings file and its validation

pub mod validation;
pub mod yaml;

use crate::system::System;
use serde::Deserialize;
use std::path::PathBuf;

/// Settings file looked up when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "./svn-sparse.yaml";

/// Tool-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Subversion command-line client to invoke
    pub svn: String,

    /// Extra directory searched for profiles
    pub profile_dir: Option<PathBuf>,

    /// Reset excluded paths that still hold local content
    pub reset_excluded: bool,

    /// Directory holding `BWConfiguration_*.cmake` files, overriding the default location
    pub build_config_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            svn: "svn".to_owned(),
            profile_dir: None,
            reset_excluded: false,
            build_config_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`
    ///
    /// A missing file yields the defaults unless it was named explicitly.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if:
    /// - An explicitly named file does not exist
    /// - The file cannot be read or is not valid YAML
    /// - The loaded settings fail validation
    pub fn load(system: &dyn System, path: &str, explicit: bool) -> anyhow::Result<Self> {
        yaml::load_settings(system, path, explicit)
    }

    /// Check the settings are usable
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the `svn` program or a configured
    /// directory is empty
    pub fn validate(&self) -> anyhow::Result<()> {
        validation::validate_settings(self)
    }
}
