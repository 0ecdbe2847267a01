//! Sparse checkout planning
//!
//! The planner never walks the whole remote tree. Excluding `X` means
//! "everything except `X`", which is recovered by listing only the ancestors
//! of `X` and fully materializing every sibling met on the way up
//! (sibling expansion). Remote listings are therefore bounded by the number
//! of distinct ancestor directories named by the profile.
//!
//! Planning runs in four steps:
//!
//! 1. **Placeholders.** Rules are walked includes first, then excludes, each
//!    from its shallowest ancestor to its leaf. The first rule to reach a path
//!    decides what happens to it; later rules skip it. Missing paths become
//!    empty-depth placeholders.
//! 2. **Sibling expansion.** For each exclude, the parent and every further
//!    ancestor up to the root is listed; children not already claimed are
//!    scheduled at infinite depth unless they are already populated locally.
//!    The walk stops at a directory that is itself excluded, so a nested
//!    exclude never fills its outer exclude.
//! 3. **Inclusions.** Each include is scheduled at infinite depth.
//! 4. **Root.** A destination that is not yet a working copy gets a root
//!    checkout ahead of everything else.

use super::local::{LocalEntry, LocalState};
use super::plan::Plan;
use crate::profile::{Profile, Rule};
use crate::remote::ListingCache;
use crate::utils::NormalizedPath;
use anyhow::Result;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// What to do with an exclude leaf that is a non-empty directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExcludedContentPolicy {
    /// Leave the content alone and warn
    #[default]
    Keep,
    /// Reset the path to an empty placeholder, discarding its local content
    Reset,
}

/// Builds a [`Plan`] for one run
///
/// Owns the run's listing cache; build once and drop.
pub struct PlanBuilder<'run> {
    local: LocalState<'run>,
    cache: ListingCache<'run>,
    policy: ExcludedContentPolicy,
    plan: Plan,
    /// Paths claimed by the placeholder pass
    visited: HashSet<NormalizedPath>,
    /// Paths scheduled for full depth or found already populated
    resolved: HashSet<NormalizedPath>,
}

impl<'run> PlanBuilder<'run> {
    #[must_use]
    pub fn new(local: LocalState<'run>, cache: ListingCache<'run>) -> Self {
        let plan = Plan::new(cache.revision());
        Self {
            local,
            cache,
            policy: ExcludedContentPolicy::default(),
            plan,
            visited: HashSet::new(),
            resolved: HashSet::new(),
        }
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: ExcludedContentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Plan the operations needed to bring the destination in line with `profile`
    ///
    /// # Errors
    ///
    /// Returns an error if a remote listing fails, the run is cancelled, or
    /// local state cannot be inspected
    pub fn build(mut self, profile: &Profile) -> Result<Plan> {
        self.plan.create_root = !self.local.is_working_copy();
        if self.plan.create_root {
            debug!(
                "{} is not a working copy, scheduling root checkout",
                self.local.root().display()
            );
        }

        self.seed_placeholders(profile)?;
        self.expand_siblings(profile)?;
        self.schedule_inclusions(profile)?;

        info!(
            "Planned {} operations at r{} ({} empty, {} infinite, {} remote listings)",
            self.plan.len(),
            self.plan.revision,
            self.plan.empty.len(),
            self.plan.infinite.len(),
            self.cache.fetched()
        );
        Ok(self.plan)
    }

    fn seed_placeholders(&mut self, profile: &Profile) -> Result<()> {
        for rule in profile.planning_order() {
            if covered_by_inclusion(profile, rule) {
                continue;
            }
            let leaf_is_full = updates_to_full_depth(profile, rule);

            for ancestor in rule.path.ancestors() {
                if !self.visited.insert(ancestor.clone()) {
                    continue;
                }
                let is_leaf = ancestor == rule.path;
                if is_leaf && leaf_is_full {
                    continue;
                }

                match self.local.entry(&ancestor)? {
                    LocalEntry::Absent => self.schedule_empty(ancestor),
                    LocalEntry::NonEmptyDirectory if is_leaf && !rule.is_include() => {
                        match self.policy {
                            ExcludedContentPolicy::Reset => {
                                debug!("Resetting excluded path {ancestor} to a placeholder");
                                self.schedule_empty(ancestor);
                            }
                            ExcludedContentPolicy::Keep => {
                                warn!(
                                    "Excluded path {ancestor} has local content; leaving it in place \
                                     (use --reset-excluded to reset it to an empty placeholder)"
                                );
                            }
                        }
                    }
                    LocalEntry::NonEmptyDirectory
                    | LocalEntry::File
                    | LocalEntry::EmptyDirectory => {}
                }
            }
        }
        Ok(())
    }

    fn expand_siblings(&mut self, profile: &Profile) -> Result<()> {
        for rule in &profile.exclusions {
            let mut current = rule.path.parent();
            while let Some(dir) = current {
                // The outer exclude's own walk covers everything from here up
                if covered_by_exclusion(profile, &dir) {
                    debug!("{dir} is excluded, not expanding siblings of {}", rule.path);
                    break;
                }
                let children: Vec<String> = self
                    .cache
                    .list(&dir)?
                    .children()
                    .map(str::to_owned)
                    .collect();

                for child in children {
                    let path = dir.join(&child);
                    if self.visited.contains(&path) || self.resolved.contains(&path) {
                        continue;
                    }
                    if self.local.entry(&path)?.is_populated() {
                        debug!("{path} is already materialized");
                        self.resolved.insert(path);
                    } else {
                        self.schedule_infinite(path);
                    }
                }

                current = dir.parent();
            }
        }
        Ok(())
    }

    fn schedule_inclusions(&mut self, profile: &Profile) -> Result<()> {
        for rule in &profile.inclusions {
            if !updates_to_full_depth(profile, rule) {
                debug!("{} holds an exclusion, recovered by sibling expansion", rule.path);
                continue;
            }
            if covered_by_inclusion(profile, rule) || self.resolved.contains(&rule.path) {
                continue;
            }
            if self.local.entry(&rule.path)?.is_populated() {
                debug!("{} is already materialized", rule.path);
                self.resolved.insert(rule.path.clone());
                continue;
            }
            self.schedule_infinite(rule.path.clone());
        }
        Ok(())
    }

    fn schedule_empty(&mut self, path: NormalizedPath) {
        debug!("Scheduling SetEmptyDepth({path})");
        self.plan.empty.push(path);
    }

    fn schedule_infinite(&mut self, path: NormalizedPath) {
        if self.resolved.insert(path.clone()) {
            debug!("Scheduling SetInfiniteDepth({path})");
            self.plan.infinite.push(path);
        }
    }
}

/// Whether an include is materialized by a full-depth update of its own path
///
/// An include holding an exclude beneath it is treated as an intermediate
/// directory instead: a full-depth update would bring the excluded subtree
/// back.
fn updates_to_full_depth(profile: &Profile, rule: &Rule) -> bool {
    rule.is_include() && !profile.has_exclusion_under(&rule.path)
}

/// Whether `rule` lies inside another include that is updated to full depth
fn covered_by_inclusion(profile: &Profile, rule: &Rule) -> bool {
    profile.inclusions.iter().any(|other| {
        rule.path.is_strictly_under(&other.path) && updates_to_full_depth(profile, other)
    })
}

/// Whether the deepest rule at or above `path` is an exclude
///
/// An exclude and an include naming the same path resolve to the exclude.
fn covered_by_exclusion(profile: &Profile, path: &NormalizedPath) -> bool {
    profile
        .planning_order()
        .filter(|rule| path.starts_with(&rule.path))
        .max_by_key(|rule| (rule.path.segments().len(), !rule.is_include()))
        .is_some_and(|rule| !rule.is_include())
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::profile::parse_profile;
    use crate::remote::{MockRemote, Revision};
    use crate::system::MockSystem;
    use std::path::Path;

    const URL: &str = "svn://mock/trunk";

    fn plan_for(system: &MockSystem, remote: &MockRemote, profile: &str) -> Plan {
        let profile = parse_profile(profile).unwrap();
        let local = LocalState::new(system, Path::new("/wc"));
        let cache = ListingCache::new(remote, URL, Revision(5), CancellationToken::new());
        PlanBuilder::new(local, cache).build(&profile).unwrap()
    }

    fn names(paths: &[NormalizedPath]) -> Vec<String> {
        paths.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_nested_include_is_covered_by_outer_include() {
        let system = MockSystem::new();
        let remote = MockRemote::new(system.clone(), URL)
            .with_file("/a/b/c.txt", b"c")
            .unwrap();
        let plan = plan_for(&system, &remote, "+/a/b\n+/a\n");

        assert!(plan.create_root);
        assert!(plan.empty.is_empty());
        assert_eq!(names(&plan.infinite), vec!["/a"]);
        assert_eq!(remote.list_calls(), 0);
    }

    #[test]
    fn test_include_with_nested_exclude_is_expanded_not_updated() {
        let system = MockSystem::new();
        let remote = MockRemote::new(system.clone(), URL)
            .with_dir("/a/b/c")
            .unwrap()
            .with_dir("/a/b/d")
            .unwrap()
            .with_dir("/a/e")
            .unwrap()
            .with_dir("/f")
            .unwrap();
        let plan = plan_for(&system, &remote, "+/a/b\n-/a/b/c\n");

        assert_eq!(names(&plan.empty), vec!["/a", "/a/b", "/a/b/c"]);
        assert_eq!(names(&plan.infinite), vec!["/a/b/d", "/a/e", "/f"]);
    }

    #[test]
    fn test_populated_exclude_leaf_is_kept_by_default() {
        let system = MockSystem::new()
            .with_dir("/wc/.svn")
            .unwrap()
            .with_file("/wc/build/out.o", b"o")
            .unwrap();
        let remote = MockRemote::new(system.clone(), URL)
            .with_dir("/build")
            .unwrap()
            .with_dir("/src")
            .unwrap();
        let plan = plan_for(&system, &remote, "-/build\n");

        assert!(!plan.create_root);
        assert!(plan.empty.is_empty());
        assert_eq!(names(&plan.infinite), vec!["/src"]);
    }

    #[test]
    fn test_populated_exclude_leaf_is_reset_when_requested() {
        let system = MockSystem::new()
            .with_dir("/wc/.svn")
            .unwrap()
            .with_file("/wc/build/out.o", b"o")
            .unwrap();
        let remote = MockRemote::new(system.clone(), URL)
            .with_dir("/build")
            .unwrap();
        let profile = parse_profile("-/build\n").unwrap();
        let local = LocalState::new(&system, Path::new("/wc"));
        let cache = ListingCache::new(&remote, URL, Revision(5), CancellationToken::new());
        let plan = PlanBuilder::new(local, cache)
            .with_policy(ExcludedContentPolicy::Reset)
            .build(&profile)
            .unwrap();

        assert_eq!(names(&plan.empty), vec!["/build"]);
    }

    #[test]
    fn test_exclude_nested_in_exclude_leaves_outer_empty() {
        let system = MockSystem::new();
        let remote = MockRemote::new(system.clone(), URL)
            .with_dir("/src")
            .unwrap()
            .with_dir("/vendor/app")
            .unwrap()
            .with_dir("/vendor/legacy")
            .unwrap();
        let plan = plan_for(&system, &remote, "-/vendor\n-/vendor/legacy\n");
        let vendor = NormalizedPath::parse("/vendor").unwrap();

        assert_eq!(names(&plan.empty), vec!["/vendor", "/vendor/legacy"]);
        assert_eq!(names(&plan.infinite), vec!["/src"]);
        assert!(!plan.infinite.iter().any(|path| path.starts_with(&vendor)));
    }

    #[test]
    fn test_include_inside_exclude_reopens_sibling_expansion() {
        let system = MockSystem::new();
        let remote = MockRemote::new(system.clone(), URL)
            .with_dir("/a/b/c")
            .unwrap()
            .with_dir("/a/b/d")
            .unwrap()
            .with_dir("/a/x")
            .unwrap()
            .with_dir("/f")
            .unwrap();
        let plan = plan_for(&system, &remote, "-/a\n+/a/b\n-/a/b/c\n");

        assert_eq!(names(&plan.empty), vec!["/a", "/a/b", "/a/b/c"]);
        assert_eq!(names(&plan.infinite), vec!["/f", "/a/b/d"]);
    }

    #[test]
    fn test_excluded_file_is_never_reset() {
        let system = MockSystem::new()
            .with_dir("/wc/.svn")
            .unwrap()
            .with_file("/wc/build.log", b"log")
            .unwrap()
            .with_dir("/wc/src/main")
            .unwrap();
        let remote = MockRemote::new(system.clone(), URL)
            .with_file("/build.log", b"log")
            .unwrap()
            .with_dir("/src/main")
            .unwrap();
        let profile = parse_profile("-/build.log\n").unwrap();
        let local = LocalState::new(&system, Path::new("/wc"));
        let cache = ListingCache::new(&remote, URL, Revision(5), CancellationToken::new());
        let plan = PlanBuilder::new(local, cache)
            .with_policy(ExcludedContentPolicy::Reset)
            .build(&profile)
            .unwrap();

        assert!(plan.empty.is_empty());
        assert!(plan.infinite.is_empty());
    }

    #[test]
    fn test_cancelled_run_stops_before_listing() {
        let system = MockSystem::new();
        let remote = MockRemote::new(system.clone(), URL).with_dir("/a").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let profile = parse_profile("-/a\n").unwrap();
        let local = LocalState::new(&system, Path::new("/wc"));
        let cache = ListingCache::new(&remote, URL, Revision(5), cancel);
        let result = PlanBuilder::new(local, cache).build(&profile);

        assert!(result.is_err());
        assert_eq!(remote.list_calls(), 0);
    }
}
