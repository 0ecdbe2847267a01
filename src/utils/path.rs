//! Repository path model and path manipulation utilities

use crate::error::SparseError;
use anyhow::Result;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// A rooted, slash-separated repository path
///
/// Stored as an ordered sequence of non-empty segments. The empty sequence
/// is the repository root and displays as `/`; every other path displays
/// with a leading `/` and no trailing `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    segments: Vec<String>,
}

impl NormalizedPath {
    /// The repository root
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse a raw rule or listing path
    ///
    /// Both separators are accepted, empty and `.` segments are dropped and a
    /// leading `/` is implied.
    ///
    /// # Errors
    ///
    /// Returns an error if the path contains a `..` segment
    pub fn parse(raw: &str) -> Result<Self> {
        let mut segments = Vec::new();
        for segment in normalize_separators(raw).split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    return Err(SparseError::configuration(format!(
                        "Path contains unsafe directory traversal: '{raw}'"
                    ))
                    .into());
                }
                other => segments.push(other.to_owned()),
            }
        }
        Ok(Self { segments })
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, `None` for the root
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Parent path, `None` for the root
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, head) = self.segments.split_last()?;
        Some(Self {
            segments: head.to_vec(),
        })
    }

    /// Append a single child segment
    #[must_use]
    pub fn join(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_owned());
        Self { segments }
    }

    /// Every path from the first level below the root down to `self`, inclusive
    pub fn ancestors(&self) -> impl Iterator<Item = Self> + '_ {
        (1..=self.segments.len()).map(|depth| Self {
            segments: self.segments[..depth].to_vec(),
        })
    }

    /// True when `self` equals `other` or lies beneath it
    #[must_use]
    pub fn starts_with(&self, other: &Self) -> bool {
        self.segments.starts_with(&other.segments)
    }

    /// True when `self` lies strictly beneath `other`
    #[must_use]
    pub fn is_strictly_under(&self, other: &Self) -> bool {
        self.segments.len() > other.segments.len() && self.starts_with(other)
    }

    /// Location of this path inside a local working copy rooted at `root`
    #[must_use]
    pub fn to_local(&self, root: &Path) -> PathBuf {
        let mut local = root.to_path_buf();
        local.extend(&self.segments);
        local
    }

    /// Location of this path beneath a repository URL
    #[must_use]
    pub fn to_url(&self, base: &str) -> String {
        let base = base.trim_end_matches('/');
        if self.is_root() {
            base.to_owned()
        } else {
            format!("{base}{self}")
        }
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl Serialize for NormalizedPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Convert backslashes to forward slashes (for cross-platform compatibility)
#[must_use]
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Upper-case a leading drive letter so `c:/wc` and `C:/wc` compare equal
#[must_use]
pub fn normalize_root_casing(path: &str) -> String {
    let mut chars = path.chars();
    match (chars.next(), chars.next()) {
        (Some(drive), Some(':')) if drive.is_ascii_alphabetic() => {
            format!("{}{}", drive.to_ascii_uppercase(), &path[1..])
        }
        _ => path.to_owned(),
    }
}

/// Express `path` relative to `root` using forward slashes
///
/// Separators and drive-letter casing are normalized on both sides first.
/// The root itself becomes `.`; a path outside `root` is returned normalized
/// but otherwise unchanged.
#[must_use]
pub fn relativize(path: &str, root: &str) -> String {
    let path = normalize_root_casing(&normalize_separators(path));
    let root = normalize_root_casing(&normalize_separators(root));
    let root = root.trim_end_matches('/');

    if path.trim_end_matches('/') == root {
        return ".".to_owned();
    }

    match path.strip_prefix(root) {
        Some(rest) if rest.starts_with('/') || root.is_empty() => {
            rest.trim_start_matches('/').to_owned()
        }
        _ => path,
    }
}
