//! Local working-copy state inspection

use crate::error::SparseError;
use crate::system::System;
use crate::utils::NormalizedPath;
use crate::utils::fs::is_directory_empty;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Name of the administrative directory marking a working-copy root
pub const ADMIN_DIR: &str = ".svn";

/// Observed state of one local path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalEntry {
    Absent,
    EmptyDirectory,
    NonEmptyDirectory,
    File,
}

impl LocalEntry {
    /// True for content that a full-depth update would not change in shape
    #[must_use]
    pub const fn is_populated(self) -> bool {
        matches!(self, Self::NonEmptyDirectory | Self::File)
    }
}

/// Read-only view of the destination working copy
///
/// The filesystem may change between an inspection and the operation that
/// relies on it; nothing here detects that.
pub struct LocalState<'src> {
    system: &'src dyn System,
    root: PathBuf,
    versioned: bool,
}

impl<'src> LocalState<'src> {
    /// Inspect the working copy rooted at `root`
    ///
    /// When `root` is not a working copy, nothing beneath it is versioned and
    /// every path reads as [`LocalEntry::Absent`].
    #[must_use]
    pub fn new(system: &'src dyn System, root: &Path) -> Self {
        let versioned = system.is_dir(&root.join(ADMIN_DIR));
        Self {
            system,
            root: root.to_path_buf(),
            versioned,
        }
    }

    /// True when the root already holds a working copy
    #[must_use]
    pub const fn is_working_copy(&self) -> bool {
        self.versioned
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the local counterpart of `path` exists
    #[must_use]
    pub fn exists(&self, path: &NormalizedPath) -> bool {
        self.versioned && self.system.exists(&path.to_local(&self.root))
    }

    /// Whether the local counterpart of `path` is a directory with no entries
    ///
    /// # Errors
    ///
    /// Returns a filesystem error if the directory cannot be read
    pub fn is_empty_directory(&self, path: &NormalizedPath) -> Result<bool> {
        if !self.versioned {
            return Ok(false);
        }
        let local = path.to_local(&self.root);
        is_directory_empty(self.system, &local).map_err(|e| {
            SparseError::filesystem(format!("Failed to inspect {}: {e:#}", local.display())).into()
        })
    }

    /// Classify the local counterpart of `path`
    ///
    /// # Errors
    ///
    /// Returns a filesystem error if the directory cannot be read
    pub fn entry(&self, path: &NormalizedPath) -> Result<LocalEntry> {
        if !self.exists(path) {
            return Ok(LocalEntry::Absent);
        }
        if !self.system.is_dir(&path.to_local(&self.root)) {
            return Ok(LocalEntry::File);
        }
        if self.is_empty_directory(path)? {
            return Ok(LocalEntry::EmptyDirectory);
        }
        Ok(LocalEntry::NonEmptyDirectory)
    }
}
