//! In-memory remote repository for testing

use super::{Depth, Notification, NotifyAction, RemoteClient, RemoteListing, Revision};
use crate::error::SparseError;
use crate::system::{MockSystem, System as _};
use crate::utils::NormalizedPath;
use crate::utils::fs::create_parent_directories;
use anyhow::{Result, anyhow};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};

/// A call received by [`MockRemote`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    ResolveRevision,
    List(NormalizedPath),
    Checkout { dest: PathBuf, depth: Depth, revision: Revision },
    Update { path: PathBuf, depth: Depth, revision: Revision },
}

impl RemoteCall {
    /// True for calls that change the working copy
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        matches!(self, Self::Checkout { .. } | Self::Update { .. })
    }
}

/// In-memory implementation of [`RemoteClient`]
///
/// Holds a repository tree and materializes checkouts and updates into a
/// shared [`MockSystem`], so the planner sees the result on its next run.
/// Every call is recorded for later inspection.
///
/// # Example
/// ```
/// use svn_sparse::remote::{MockRemote, RemoteClient};
/// use svn_sparse::system::MockSystem;
///
/// let remote = MockRemote::new(MockSystem::new(), "svn://mock/trunk")
///     .with_revision(42)
///     .with_file("/src/main.c", b"int main;").unwrap();
///
/// assert_eq!(remote.resolve_revision("svn://mock/trunk").unwrap().0, 42);
/// ```
#[derive(Clone)]
pub struct MockRemote {
    state: Arc<RwLock<MockRemoteState>>,
    system: MockSystem,
}

struct MockRemoteState {
    base_url: String,
    head: Revision,
    dirs: BTreeSet<NormalizedPath>,
    files: BTreeMap<NormalizedPath, Vec<u8>>,
    working_copy: Option<PathBuf>,
    failing: HashSet<NormalizedPath>,
    calls: Vec<RemoteCall>,
}

impl MockRemote {
    /// Create an empty repository served at `base_url`
    #[must_use]
    pub fn new(system: MockSystem, base_url: &str) -> Self {
        Self {
            state: Arc::new(RwLock::new(MockRemoteState {
                base_url: base_url.trim_end_matches('/').to_owned(),
                head: Revision(1),
                dirs: BTreeSet::from([NormalizedPath::root()]),
                files: BTreeMap::new(),
                working_copy: None,
                failing: HashSet::new(),
                calls: Vec::new(),
            })),
            system,
        }
    }

    /// Set the HEAD revision (builder pattern)
    #[must_use]
    pub fn with_revision(self, revision: u64) -> Self {
        if let Ok(mut state) = self.state.write() {
            state.head = Revision(revision);
        }
        self
    }

    /// Add a directory and its parents (builder pattern)
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid
    pub fn with_dir(self, path: &str) -> Result<Self> {
        let path = NormalizedPath::parse(path)?;
        let mut state = self.lock()?;
        for ancestor in path.ancestors() {
            state.dirs.insert(ancestor);
        }
        drop(state);
        Ok(self)
    }

    /// Add a file and its parent directories (builder pattern)
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or names the root
    pub fn with_file(self, path: &str, contents: &[u8]) -> Result<Self> {
        let path = NormalizedPath::parse(path)?;
        let parent = path
            .parent()
            .ok_or_else(|| anyhow!("The repository root cannot be a file"))?;
        let mut state = self.lock()?;
        for ancestor in parent.ancestors() {
            state.dirs.insert(ancestor);
        }
        state.files.insert(path, contents.to_vec());
        drop(state);
        Ok(self)
    }

    /// Make listing `path` fail with a remote error (builder pattern)
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid
    pub fn with_failing_list(self, path: &str) -> Result<Self> {
        let path = NormalizedPath::parse(path)?;
        self.lock()?.failing.insert(path);
        Ok(self)
    }

    /// Every call received so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state
            .read()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    /// Number of listing calls received so far
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, RemoteCall::List(_)))
            .count()
    }

    /// Calls that changed the working copy, in order
    #[must_use]
    pub fn mutating_calls(&self) -> Vec<RemoteCall> {
        self.calls()
            .into_iter()
            .filter(RemoteCall::is_mutating)
            .collect()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        if let Ok(mut state) = self.state.write() {
            state.calls.clear();
        }
    }

    fn lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, MockRemoteState>> {
        self.state.write().map_err(|e| anyhow!(e.to_string()))
    }

    fn record(&self, call: RemoteCall) -> Result<()> {
        self.lock()?.calls.push(call);
        Ok(())
    }

    /// Map a local path inside the working copy back to its repository path
    fn remote_path(&self, local: &Path) -> Result<(PathBuf, NormalizedPath)> {
        let root = self
            .state
            .read()
            .map_err(|e| anyhow!(e.to_string()))?
            .working_copy
            .clone()
            .ok_or_else(|| SparseError::remote("No working copy has been checked out"))?;

        let relative = local.strip_prefix(&root).map_err(|_| {
            SparseError::remote(format!(
                "'{}' is not inside the working copy {}",
                local.display(),
                root.display()
            ))
        })?;

        let mut path = NormalizedPath::root();
        for component in relative.components() {
            if let Component::Normal(segment) = component {
                path = path.join(&segment.to_string_lossy());
            }
        }
        Ok((root, path))
    }

    /// Copy `path` and, for directories, everything beneath it into the working copy
    fn materialize(
        &self,
        root: &Path,
        path: &NormalizedPath,
        notify: &mut dyn FnMut(Notification),
    ) -> Result<()> {
        let (dirs, files) = {
            let state = self.state.read().map_err(|e| anyhow!(e.to_string()))?;
            let dirs: Vec<NormalizedPath> = state
                .dirs
                .iter()
                .filter(|d| d.starts_with(path))
                .cloned()
                .collect();
            let files: Vec<(NormalizedPath, Vec<u8>)> = state
                .files
                .iter()
                .filter(|(f, _)| f.starts_with(path))
                .map(|(f, c)| (f.clone(), c.clone()))
                .collect();
            (dirs, files)
        };

        for dir in dirs {
            let local = dir.to_local(root);
            if !self.system.is_dir(&local) {
                self.system.create_dir_all(&local)?;
                notify(Notification::new(NotifyAction::Add, local.display().to_string()));
            }
        }
        for (file, contents) in files {
            let local = file.to_local(root);
            let action = if self.system.exists(&local) {
                NotifyAction::Update
            } else {
                NotifyAction::Add
            };
            create_parent_directories(&self.system, &local)?;
            self.system.write(&local, &contents)?;
            notify(Notification::new(action, local.display().to_string()));
        }
        Ok(())
    }
}

impl RemoteClient for MockRemote {
    fn resolve_revision(&self, url: &str) -> Result<Revision> {
        self.record(RemoteCall::ResolveRevision)?;
        let state = self.state.read().map_err(|e| anyhow!(e.to_string()))?;
        if url.trim_end_matches('/') != state.base_url {
            return Err(SparseError::remote(format!("Unknown repository URL: {url}")).into());
        }
        Ok(state.head)
    }

    fn list(
        &self,
        _base_url: &str,
        path: &NormalizedPath,
        _revision: Revision,
    ) -> Result<RemoteListing> {
        self.record(RemoteCall::List(path.clone()))?;
        let state = self.state.read().map_err(|e| anyhow!(e.to_string()))?;

        if state.failing.contains(path) {
            return Err(SparseError::remote(format!("Connection reset while listing {path}")).into());
        }
        if !state.dirs.contains(path) {
            return Err(SparseError::remote(format!("Path not found: {path}")).into());
        }

        let is_child = |candidate: &NormalizedPath| candidate.parent().as_ref() == Some(path);
        Ok(RemoteListing {
            path: path.clone(),
            directories: state
                .dirs
                .iter()
                .filter(|d| is_child(*d))
                .filter_map(|d| d.name().map(str::to_owned))
                .collect(),
            files: state
                .files
                .keys()
                .filter(|f| is_child(*f))
                .filter_map(|f| f.name().map(str::to_owned))
                .collect(),
        })
    }

    fn checkout(
        &self,
        url: &str,
        dest: &Path,
        depth: Depth,
        revision: Revision,
        notify: &mut dyn FnMut(Notification),
    ) -> Result<()> {
        self.record(RemoteCall::Checkout {
            dest: dest.to_path_buf(),
            depth,
            revision,
        })?;
        {
            let mut state = self.lock()?;
            if url.trim_end_matches('/') != state.base_url {
                return Err(SparseError::remote(format!("Unknown repository URL: {url}")).into());
            }
            state.working_copy = Some(dest.to_path_buf());
        }

        self.system.create_dir_all(&dest.join(".svn"))?;
        if depth == Depth::Infinity {
            self.materialize(dest, &NormalizedPath::root(), notify)?;
        }
        notify(Notification::new(NotifyAction::Completed, ""));
        Ok(())
    }

    fn update(
        &self,
        path: &Path,
        depth: Depth,
        revision: Revision,
        notify: &mut dyn FnMut(Notification),
    ) -> Result<()> {
        self.record(RemoteCall::Update {
            path: path.to_path_buf(),
            depth,
            revision,
        })?;
        let (root, remote) = self.remote_path(path)?;

        if let Some(parent) = path.parent()
            && !self.system.is_dir(parent)
        {
            return Err(SparseError::remote(format!(
                "'{}' is not a working copy directory",
                parent.display()
            ))
            .into());
        }

        let (is_dir, is_file) = {
            let state = self.state.read().map_err(|e| anyhow!(e.to_string()))?;
            (state.dirs.contains(&remote), state.files.contains_key(&remote))
        };
        if !is_dir && !is_file {
            return Err(SparseError::remote(format!("Path not found: {remote}")).into());
        }

        notify(Notification::new(
            NotifyAction::UpdateStarted,
            path.display().to_string(),
        ));
        match depth {
            Depth::Empty if is_dir => {
                if self.system.is_dir(path) {
                    for child in self.system.read_dir(path)? {
                        notify(Notification::new(NotifyAction::Delete, child.display().to_string()));
                    }
                    self.system.remove_dir_all(path)?;
                } else {
                    notify(Notification::new(NotifyAction::Add, path.display().to_string()));
                }
                self.system.create_dir_all(path)?;
            }
            Depth::Empty | Depth::Infinity => self.materialize(&root, &remote, notify)?,
        }
        notify(Notification::new(NotifyAction::Completed, ""));
        Ok(())
    }
}
