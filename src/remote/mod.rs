//! Remote namespace module
//!
//! Talks to the centrally versioned repository: resolves the pinned revision,
//! lists immediate children of remote directories, and checks out or updates
//! local working-copy paths at a given depth.

pub mod cache;
pub mod mock;
pub mod svn;

pub use cache::ListingCache;
pub use mock::{MockRemote, RemoteCall};
pub use svn::SvnClient;

use crate::utils::NormalizedPath;
use anyhow::{Context as _, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A repository snapshot identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Revision(pub u64);

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Revision {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches('r');
        let number = trimmed
            .parse::<u64>()
            .with_context(|| format!("Invalid revision: '{s}'"))?;
        Ok(Self(number))
    }
}

/// How much of a directory a working copy materializes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Depth {
    /// The directory itself, no children
    Empty,
    /// The directory and everything beneath it
    Infinity,
}

impl Depth {
    #[must_use]
    pub const fn as_arg(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Infinity => "infinity",
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

/// Immediate children of one remote directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteListing {
    pub path: NormalizedPath,
    pub directories: BTreeSet<String>,
    pub files: BTreeSet<String>,
}

impl RemoteListing {
    /// Child names, directories first
    pub fn children(&self) -> impl Iterator<Item = &str> {
        self.directories
            .iter()
            .chain(self.files.iter())
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.directories.len() + self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Kind of working-copy change reported while a remote command runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyAction {
    Add,
    Delete,
    Restore,
    Revert,
    Update,
    External,
    Exists,
    Conflict,
    Skip,
    UpdateStarted,
    Completed,
}

/// One change reported by the remote client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub action: NotifyAction,
    pub path: String,
}

impl Notification {
    #[must_use]
    pub fn new<S: Into<String>>(action: NotifyAction, path: S) -> Self {
        Self {
            action,
            path: path.into(),
        }
    }
}

/// Access to the remote hierarchical namespace
///
/// Every call blocks until the remote operation completes.
///
/// # Implementations
/// - `SvnClient`: drives the `svn` command-line client
/// - `MockRemote`: in-memory repository for tests
pub trait RemoteClient {
    /// Latest revision of the repository at `url`
    fn resolve_revision(&self, url: &str) -> Result<Revision>;

    /// Immediate children of `path` beneath `base_url` at `revision`
    fn list(&self, base_url: &str, path: &NormalizedPath, revision: Revision)
    -> Result<RemoteListing>;

    /// Create a working copy of `url` at `dest`
    fn checkout(
        &self,
        url: &str,
        dest: &Path,
        depth: Depth,
        revision: Revision,
        notify: &mut dyn FnMut(Notification),
    ) -> Result<()>;

    /// Update a working-copy path, making `depth` sticky
    fn update(
        &self,
        path: &Path,
        depth: Depth,
        revision: Revision,
        notify: &mut dyn FnMut(Notification),
    ) -> Result<()>;
}

/// Why a working-copy entry is not under version control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnversionedKind {
    /// Status `?`
    Unversioned,
    /// Status `I`, matched by an ignore pattern
    Ignored,
}

impl fmt::Display for UnversionedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unversioned => f.write_str("unversioned"),
            Self::Ignored => f.write_str("ignored"),
        }
    }
}

/// One entry of a working copy that the repository does not know about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnversionedEntry {
    pub kind: UnversionedKind,
    pub path: PathBuf,
}

/// Local working-copy maintenance
///
/// # Implementations
/// - `SvnClient`: runs `svn revert` and `svn status`
pub trait WorkingCopyClient {
    /// Discard local modifications beneath `path`
    fn revert_recursive(&self, path: &Path) -> Result<()>;

    /// Unversioned and ignored entries beneath `path`, as reported by the client
    fn unversioned_entries(&self, path: &Path) -> Result<Vec<UnversionedEntry>>;
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;

    #[test]
    fn revision_parses_with_or_without_prefix() {
        assert_eq!("1234".parse::<Revision>().unwrap(), Revision(1234));
        assert_eq!("r42\n".parse::<Revision>().unwrap(), Revision(42));
        assert!("HEAD".parse::<Revision>().is_err());
    }

    #[test]
    fn listing_children_put_directories_first() {
        let listing = RemoteListing {
            path: NormalizedPath::root(),
            directories: BTreeSet::from(["src".to_owned(), "docs".to_owned()]),
            files: BTreeSet::from(["README".to_owned()]),
        };
        let children: Vec<&str> = listing.children().collect();
        assert_eq!(children, vec!["docs", "src", "README"]);
        assert_eq!(listing.len(), 3);
    }
}
