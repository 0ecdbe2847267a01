//! Sparse checkout plan

use crate::remote::{Depth, Revision};
use crate::utils::NormalizedPath;
use serde::Serialize;
use std::fmt;

/// One step of a sparse checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Check the destination out with no children materialized
    CreateRoot,
    /// Make `path` exist locally with no children materialized
    SetEmptyDepth(NormalizedPath),
    /// Materialize `path` and everything beneath it
    SetInfiniteDepth(NormalizedPath),
}

impl Operation {
    /// Depth the operation leaves its path at
    #[must_use]
    pub const fn depth(&self) -> Depth {
        match self {
            Self::CreateRoot | Self::SetEmptyDepth(_) => Depth::Empty,
            Self::SetInfiniteDepth(_) => Depth::Infinity,
        }
    }

    /// Repository path the operation targets
    #[must_use]
    pub fn path(&self) -> NormalizedPath {
        match self {
            Self::CreateRoot => NormalizedPath::root(),
            Self::SetEmptyDepth(path) | Self::SetInfiniteDepth(path) => path.clone(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateRoot => f.write_str("CreateRoot"),
            Self::SetEmptyDepth(path) => write!(f, "SetEmptyDepth({path})"),
            Self::SetInfiniteDepth(path) => write!(f, "SetInfiniteDepth({path})"),
        }
    }
}

/// Ordered operations for one sparse checkout run, pinned to one revision
///
/// Applied as: root checkout (if any), then every `empty` path in order, then
/// every `infinite` path in order. No path appears in both lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub revision: Revision,
    pub create_root: bool,
    pub empty: Vec<NormalizedPath>,
    pub infinite: Vec<NormalizedPath>,
}

impl Plan {
    #[must_use]
    pub const fn new(revision: Revision) -> Self {
        Self {
            revision,
            create_root: false,
            empty: Vec::new(),
            infinite: Vec::new(),
        }
    }

    /// Operations in execution order
    pub fn operations(&self) -> impl Iterator<Item = Operation> + '_ {
        self.create_root
            .then_some(Operation::CreateRoot)
            .into_iter()
            .chain(self.empty.iter().cloned().map(Operation::SetEmptyDepth))
            .chain(self.infinite.iter().cloned().map(Operation::SetInfiniteDepth))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.create_root) + self.empty.len() + self.infinite.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
