//! Build staleness check coordination

use crate::build::{StalenessReport, check_staleness, discover_configurations, parse_changed_paths};
use crate::error::SparseError;
use crate::operations::checkout::OutputFormat;
use crate::system::System;
use anyhow::{Context as _, Result};
use std::io::Read as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where the changed paths come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSource {
    None,
    Stdin,
    File(PathBuf),
}

impl ChangeSource {
    /// `-` reads standard input, anything else names a file
    #[must_use]
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None => Self::None,
            Some("-") => Self::Stdin,
            Some(path) => Self::File(PathBuf::from(path)),
        }
    }
}

/// Reports which build configurations a change set invalidates
pub struct BuildCheckOperation<'src> {
    root: PathBuf,
    config_dir: Option<PathBuf>,
    changes: ChangeSource,
    output_format: OutputFormat,
    system: &'src dyn System,
}

impl<'src> BuildCheckOperation<'src> {
    #[must_use]
    pub fn new(
        root: &Path,
        config_dir: Option<&Path>,
        changes: ChangeSource,
        output_format: OutputFormat,
        system: &'src dyn System,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            config_dir: config_dir.map(Path::to_path_buf),
            changes,
            output_format,
            system,
        }
    }

    /// Check every configuration and print the verdicts
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the configurations or the change list
    /// cannot be read
    pub fn execute(&self) -> Result<Vec<StalenessReport>> {
        let configs = discover_configurations(self.system, &self.root, self.config_dir.as_deref())?;
        info!("Found {} build configurations", configs.len());

        let changed = parse_changed_paths(&self.read_changes()?);
        debug!("Checking {} changed paths", changed.len());

        let reports = check_staleness(&configs, &changed);
        self.print(&reports)?;
        Ok(reports)
    }

    fn read_changes(&self) -> Result<String> {
        match &self.changes {
            ChangeSource::None => Ok(String::new()),
            ChangeSource::Stdin => {
                let mut content = String::new();
                std::io::stdin()
                    .read_to_string(&mut content)
                    .map_err(|e| SparseError::configuration(format!("Failed to read stdin: {e}")))?;
                Ok(content)
            }
            ChangeSource::File(path) => self.system.read_to_string(path).map_err(|e| {
                SparseError::configuration(format!(
                    "Failed to read change list {}: {e}",
                    path.display()
                ))
                .into()
            }),
        }
    }

    fn print(&self, reports: &[StalenessReport]) -> Result<()> {
        match self.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(reports)
                    .context("Failed to serialize staleness reports")?;
                println!("{json}");
            }
            OutputFormat::Text => {
                for report in reports {
                    if report.stale {
                        println!(
                            "{}: needs rebuild ({} changed paths)",
                            report.configuration,
                            report.triggers.len()
                        );
                        for trigger in &report.triggers {
                            debug!("  {} <- {trigger}", report.configuration);
                        }
                    } else {
                        println!("{}: up to date", report.configuration);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;
    use crate::build::CONFIGURATION_DIR;
    use crate::system::MockSystem;

    #[test]
    fn test_change_source_from_arg() {
        assert_eq!(ChangeSource::from_arg(None), ChangeSource::None);
        assert_eq!(ChangeSource::from_arg(Some("-")), ChangeSource::Stdin);
        assert_eq!(
            ChangeSource::from_arg(Some("changes.txt")),
            ChangeSource::File(PathBuf::from("changes.txt"))
        );
    }

    #[test]
    fn test_reports_stale_configurations_from_change_file() {
        let dir = format!("/src/{CONFIGURATION_DIR}");
        let system = MockSystem::new()
            .with_file(
                format!("{dir}/BWConfiguration_client.cmake"),
                b"SET( BW_BINARY_PROJECTS\n  client  client/app\n)\n",
            )
            .unwrap()
            .with_file(
                format!("{dir}/BWConfiguration_server.cmake"),
                b"SET( BW_BINARY_PROJECTS\n  server/baseapp\n)\n",
            )
            .unwrap()
            .with_file("/tmp/changes.txt", b"client/app/main.cpp\n")
            .unwrap();

        let op = BuildCheckOperation::new(
            Path::new("/src"),
            None,
            ChangeSource::File(PathBuf::from("/tmp/changes.txt")),
            OutputFormat::Text,
            &system,
        );
        let reports = op.execute().unwrap();

        assert_eq!(reports.len(), 2);
        assert!(reports[0].stale);
        assert!(!reports[1].stale);
    }

    #[test]
    fn test_missing_change_file_is_configuration_error() {
        let system = MockSystem::new().with_dir("/cfg").unwrap();
        let op = BuildCheckOperation::new(
            Path::new("/src"),
            Some(Path::new("/cfg")),
            ChangeSource::File(PathBuf::from("/nope.txt")),
            OutputFormat::Json,
            &system,
        );
        let err = op.execute().unwrap_err();
        assert_eq!(err.downcast_ref::<SparseError>().unwrap().exit_code(), 1);
    }
}
