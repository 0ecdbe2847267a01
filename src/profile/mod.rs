//! Sparse profile module
//!
//! A profile is a plain-text list of `+path` (include) and `-path` (exclude)
//! rules that drives the sparse checkout planner.

pub mod parser;

pub use parser::*;

use crate::utils::NormalizedPath;
use std::fmt;

/// Whether a rule adds or removes a subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Include,
    Exclude,
}

/// A single profile rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub kind: RuleKind,
    pub path: NormalizedPath,
}

impl Rule {
    #[must_use]
    pub const fn include(path: NormalizedPath) -> Self {
        Self {
            kind: RuleKind::Include,
            path,
        }
    }

    #[must_use]
    pub const fn exclude(path: NormalizedPath) -> Self {
        Self {
            kind: RuleKind::Exclude,
            path,
        }
    }

    #[must_use]
    pub fn is_include(&self) -> bool {
        self.kind == RuleKind::Include
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.kind {
            RuleKind::Include => '+',
            RuleKind::Exclude => '-',
        };
        write!(f, "{sign}{}", self.path)
    }
}

/// Parsed profile, each list in original file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub exclusions: Vec<Rule>,
    pub inclusions: Vec<Rule>,
}

impl Profile {
    /// Rules in the order the planner seeds placeholders: every include, then every exclude
    pub fn planning_order(&self) -> impl Iterator<Item = &Rule> {
        self.inclusions.iter().chain(self.exclusions.iter())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exclusions.is_empty() && self.inclusions.is_empty()
    }

    /// True when some exclude rule lies strictly beneath `path`
    #[must_use]
    pub fn has_exclusion_under(&self, path: &NormalizedPath) -> bool {
        self.exclusions
            .iter()
            .any(|rule| rule.path.is_strictly_under(path))
    }
}
