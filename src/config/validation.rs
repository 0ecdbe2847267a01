//! Settings and argument validation logic

use crate::config::Settings;
use crate::error::SparseError;
use anyhow::Result;
use regex::Regex;

/// Validate loaded settings
///
/// # Errors
///
/// Returns a configuration error if:
/// - The `svn` program is empty
/// - A configured directory is empty
#[inline]
pub fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.svn.trim().is_empty() {
        return Err(SparseError::configuration("Setting 'svn' cannot be empty").into());
    }

    for (key, dir) in [
        ("profile_dir", settings.profile_dir.as_ref()),
        ("build_config_dir", settings.build_config_dir.as_ref()),
    ] {
        if let Some(dir) = dir
            && dir.as_os_str().is_empty()
        {
            return Err(SparseError::configuration(format!(
                "Setting '{key}' cannot be empty"
            ))
            .into());
        }
    }

    Ok(())
}

/// Validate a repository URL format
///
/// # Errors
///
/// Returns a configuration error if the URL uses a scheme Subversion does
/// not serve repositories over
#[inline]
pub fn validate_repository_url(url: &str) -> Result<()> {
    let patterns = [
        r"^svn(\+[\w-]+)?://\S+$", // svn://host/repo, svn+ssh://host/repo
        r"^https?://\S+$",         // https://host/svn/repo
        r"^file://\S+$",           // file:///srv/svn/repo
    ];

    for pattern in &patterns {
        let regex = Regex::new(pattern)?;
        if regex.is_match(url) {
            return Ok(());
        }
    }

    Err(SparseError::configuration(format!(
        "Invalid repository URL format: '{url}'\n\
        Supported formats:\n\
        - svn://host/path or svn+ssh://host/path\n\
        - http://host/path or https://host/path\n\
        - file:///path/to/repository"
    ))
    .into())
}
