//! Revert-all coordination
//!
//! Returns a working copy to the pristine state of its base revision:
//! local modifications are reverted, then every unversioned or ignored
//! entry is deleted.

use crate::cancel::CancellationToken;
use crate::error::SparseError;
use crate::remote::{UnversionedEntry, WorkingCopyClient};
use crate::sparse::ExecutionMode;
use crate::system::System;
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What a revert-all run removed (or would remove)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevertSummary {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// Reverts a working copy and deletes everything the repository does not track
pub struct RevertAllOperation<'src> {
    path: PathBuf,
    mode: ExecutionMode,
    system: &'src dyn System,
    client: &'src dyn WorkingCopyClient,
    cancel: CancellationToken,
}

impl<'src> RevertAllOperation<'src> {
    /// Anchor `path` at the current directory
    ///
    /// # Errors
    ///
    /// Returns a filesystem error if the current directory is unavailable or
    /// `path` does not exist
    pub fn new(
        path: &Path,
        mode: ExecutionMode,
        system: &'src dyn System,
        client: &'src dyn WorkingCopyClient,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let path = if path.is_relative() {
            let cwd = system.current_dir().map_err(|e| {
                SparseError::filesystem(format!("Cannot get current directory: {e}"))
            })?;
            cwd.join(path)
        } else {
            path.to_path_buf()
        };

        if !system.exists(&path) {
            return Err(SparseError::filesystem(format!(
                "Working copy not found: {}",
                path.display()
            ))
            .into());
        }

        Ok(Self {
            path,
            mode,
            system,
            client,
            cancel,
        })
    }

    /// Revert, then delete unversioned and ignored entries
    ///
    /// Deletion failures do not stop the run; they are collected and
    /// reported together once every entry has been tried.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `svn revert` or `svn status` fails
    /// - The run is cancelled
    /// - Any entry could not be deleted
    pub fn execute(&self) -> Result<RevertSummary> {
        let path = self.path.as_path();

        if self.mode == ExecutionMode::DryRun {
            info!("Dry run preview - no files will be modified:");
            info!("Would revert {} recursively", path.display());
        } else {
            self.cancel.check()?;
            self.client
                .revert_recursive(path)
                .with_context(|| format!("Failed to revert {}", path.display()))?;
            info!("Reverted {}", path.display());
        }

        self.cancel.check()?;
        let entries = self
            .client
            .unversioned_entries(path)
            .with_context(|| format!("Failed to read status of {}", path.display()))?;
        debug!("{} unversioned or ignored entries", entries.len());

        let mut summary = RevertSummary::default();
        for entry in &entries {
            self.cancel.check()?;
            let target = self.anchor(entry);
            if self.mode == ExecutionMode::DryRun {
                info!("Would delete {} '{}'", entry.kind, target.display());
                summary.deleted.push(target);
                continue;
            }
            match self.delete(&target) {
                Ok(Some(noun)) => {
                    info!("Deleted {} {noun} '{}'", entry.kind, target.display());
                    summary.deleted.push(target);
                }
                Ok(None) => debug!("Already gone: {}", target.display()),
                Err(e) => {
                    warn!("Failed to delete '{}': {e}", target.display());
                    summary.failed.push(target);
                }
            }
        }

        if !summary.failed.is_empty() {
            return Err(SparseError::filesystem(format!(
                "Failed to delete {} of {} entries under {}",
                summary.failed.len(),
                entries.len(),
                path.display()
            ))
            .into());
        }

        if self.mode == ExecutionMode::Apply {
            info!(
                "\u{2713} {} is clean ({} entries deleted)",
                path.display(),
                summary.deleted.len()
            );
        }
        Ok(summary)
    }

    /// Status paths are printed relative to the directory svn ran in
    fn anchor(&self, entry: &UnversionedEntry) -> PathBuf {
        if entry.path.is_relative() {
            self.system
                .current_dir()
                .map_or_else(|_| entry.path.clone(), |cwd| cwd.join(&entry.path))
        } else {
            entry.path.clone()
        }
    }

    fn delete(&self, target: &Path) -> std::io::Result<Option<&'static str>> {
        if self.system.is_file(target) {
            self.system.remove_file(target)?;
            Ok(Some("file"))
        } else if self.system.is_dir(target) {
            self.system.remove_dir_all(target)?;
            Ok(Some("directory"))
        } else {
            Ok(None)
        }
    }
}
