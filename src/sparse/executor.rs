//! Plan execution

use super::plan::{Operation, Plan};
use crate::cancel::CancellationToken;
use crate::error::SparseError;
use crate::remote::{Depth, Notification, NotifyAction, RemoteClient, Revision};
use crate::utils::path::relativize;
use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Whether operations are applied or only described
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    #[default]
    Apply,
    DryRun,
}

/// Working-copy changes worth reporting to an observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Add,
    Delete,
    Restore,
    Revert,
    Update,
    External,
}

impl EventKind {
    /// Map a remote notification onto a reportable kind; informational ones map to `None`
    #[must_use]
    pub const fn from_action(action: NotifyAction) -> Option<Self> {
        match action {
            NotifyAction::Add => Some(Self::Add),
            NotifyAction::Delete => Some(Self::Delete),
            NotifyAction::Restore => Some(Self::Restore),
            NotifyAction::Revert => Some(Self::Revert),
            NotifyAction::Update => Some(Self::Update),
            NotifyAction::External => Some(Self::External),
            NotifyAction::Exists
            | NotifyAction::Conflict
            | NotifyAction::Skip
            | NotifyAction::UpdateStarted
            | NotifyAction::Completed => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Delete => "delete",
            Self::Restore => "restore",
            Self::Revert => "revert",
            Self::Update => "update",
            Self::External => "external",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change made while applying a plan, path relative to the destination root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub kind: EventKind,
    pub path: String,
}

/// Receives progress events while a plan is applied
pub trait ProgressObserver {
    fn on_event(&mut self, event: &ProgressEvent);
}

impl<F: FnMut(&ProgressEvent)> ProgressObserver for F {
    fn on_event(&mut self, event: &ProgressEvent) {
        self(event);
    }
}

/// Outcome of applying (or describing) a plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub operations: usize,
    pub events: usize,
}

/// Applies a [`Plan`] against a destination working copy
///
/// Operations run strictly in plan order. The cancellation token is polled
/// before each one; a cancelled or failed run leaves already-applied
/// operations in place.
pub struct Executor<'run> {
    remote: &'run dyn RemoteClient,
    url: String,
    dest: PathBuf,
    mode: ExecutionMode,
    cancel: CancellationToken,
}

impl<'run> Executor<'run> {
    #[must_use]
    pub fn new(
        remote: &'run dyn RemoteClient,
        url: &str,
        dest: &Path,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            remote,
            url: url.to_owned(),
            dest: dest.to_path_buf(),
            mode: ExecutionMode::Apply,
            cancel,
        }
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Human-readable action for `op`
    #[must_use]
    pub fn describe(&self, op: &Operation, revision: Revision) -> String {
        match op {
            Operation::CreateRoot => format!(
                "check out {} into {} at depth {} (r{revision})",
                self.url,
                self.dest.display(),
                op.depth()
            ),
            Operation::SetEmptyDepth(path) | Operation::SetInfiniteDepth(path) => format!(
                "update {} to depth {} (r{revision})",
                path.to_local(&self.dest).display(),
                op.depth()
            ),
        }
    }

    /// Apply or describe every operation of `plan` in order
    ///
    /// # Errors
    ///
    /// Returns `SparseError::Cancelled` when cancellation is observed, or the
    /// first remote failure; remaining operations are not attempted
    pub fn execute(
        &self,
        plan: &Plan,
        mut observer: Option<&mut dyn ProgressObserver>,
    ) -> Result<ExecutionSummary> {
        let root = self.dest.display().to_string();
        let mut summary = ExecutionSummary::default();

        for op in plan.operations() {
            self.cancel.check()?;
            let description = self.describe(&op, plan.revision);

            if self.mode == ExecutionMode::DryRun {
                info!("Would {description}");
                summary.operations += 1;
                continue;
            }

            debug!("Applying {op}");
            let mut forward = |notification: Notification| {
                let Some(kind) = EventKind::from_action(notification.action) else {
                    return;
                };
                summary.events += 1;
                if let Some(observer) = observer.as_deref_mut() {
                    observer.on_event(&ProgressEvent {
                        kind,
                        path: relativize(&notification.path, &root),
                    });
                }
            };

            let result = match &op {
                Operation::CreateRoot => self.remote.checkout(
                    &self.url,
                    &self.dest,
                    Depth::Empty,
                    plan.revision,
                    &mut forward,
                ),
                Operation::SetEmptyDepth(path) | Operation::SetInfiniteDepth(path) => {
                    self.remote.update(
                        &path.to_local(&self.dest),
                        op.depth(),
                        plan.revision,
                        &mut forward,
                    )
                }
            };

            if let Err(err) = result {
                if self.cancel.is_cancelled() {
                    return Err(SparseError::Cancelled.into());
                }
                return Err(err.context(format!("Failed to {description}")));
            }
            summary.operations += 1;
        }

        Ok(summary)
    }
}
