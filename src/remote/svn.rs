//! Subversion command-line client

use super::{
    Depth, Notification, NotifyAction, RemoteClient, RemoteListing, Revision, UnversionedEntry,
    UnversionedKind, WorkingCopyClient,
};
use crate::cancel::CancellationToken;
use crate::error::SparseError;
use crate::utils::NormalizedPath;
use crate::utils::path::normalize_separators;
use anyhow::{Context as _, Result};
use std::io::{BufRead as _, BufReader, Read as _};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

/// Remote client backed by the `svn` binary
///
/// Commands run with `--non-interactive`; credentials must already be
/// cached. The cancellation token is polled before every command.
#[derive(Debug, Clone)]
pub struct SvnClient {
    program: String,
    cancel: CancellationToken,
}

impl SvnClient {
    #[must_use]
    pub fn new<S: Into<String>>(program: S, cancel: CancellationToken) -> Self {
        Self {
            program: program.into(),
            cancel,
        }
    }

    /// Run a command to completion and return its stdout
    fn capture(&self, args: &[String]) -> Result<String> {
        self.cancel.check()?;
        debug!("{} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to execute {}", self.program))?;

        if !output.status.success() {
            return Err(self.failure(args, &String::from_utf8_lossy(&output.stderr)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a command, forwarding each recognised output line as a notification
    fn stream(&self, args: &[String], notify: &mut dyn FnMut(Notification)) -> Result<()> {
        self.cancel.check()?;
        debug!("{} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to execute {}", self.program))?;

        // Drained on its own thread so a chatty stderr cannot stall stdout
        let stderr = child.stderr.take();
        let stderr_reader = thread::spawn(move || {
            let mut buffer = String::new();
            if let Some(mut pipe) = stderr
                && let Err(e) = pipe.read_to_string(&mut buffer)
            {
                debug!("Failed to read svn stderr: {e}");
            }
            buffer
        });

        // svn prints paths in the local code page, so lines are decoded lossily
        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout);
            let mut buffer = Vec::new();
            loop {
                buffer.clear();
                match reader.read_until(b'\n', &mut buffer) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buffer);
                        if let Some(notification) =
                            parse_notification(line.trim_end_matches(['\r', '\n']))
                        {
                            notify(notification);
                        }
                    }
                    Err(e) => {
                        if let Err(kill_error) = child.kill() {
                            debug!("Failed to stop {}: {kill_error}", self.program);
                        }
                        if let Err(wait_error) = child.wait() {
                            debug!("Failed to reap {}: {wait_error}", self.program);
                        }
                        return Err(e).context("Failed to read svn output");
                    }
                }
            }
        }

        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for {}", self.program))?;
        let stderr = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            return Err(self.failure(args, &stderr));
        }
        Ok(())
    }

    fn failure(&self, args: &[String], stderr: &str) -> anyhow::Error {
        // An interrupt also reaches the child, which then exits non-zero
        if self.cancel.is_cancelled() {
            return SparseError::Cancelled.into();
        }
        let command = args.first().map_or("", String::as_str);
        SparseError::remote(format!("svn {command} failed: {}", stderr.trim())).into()
    }
}

impl RemoteClient for SvnClient {
    fn resolve_revision(&self, url: &str) -> Result<Revision> {
        let args = [
            "info".to_owned(),
            "--non-interactive".to_owned(),
            "--show-item".to_owned(),
            "revision".to_owned(),
            url.to_owned(),
        ];
        let output = self.capture(&args)?;
        output.parse::<Revision>().map_err(|e| {
            SparseError::remote(format!("Unexpected svn info output for {url}: {e}")).into()
        })
    }

    fn list(
        &self,
        base_url: &str,
        path: &NormalizedPath,
        revision: Revision,
    ) -> Result<RemoteListing> {
        let url = path.to_url(base_url);
        let args = [
            "list".to_owned(),
            "--non-interactive".to_owned(),
            format!("{url}@{revision}"),
        ];
        let output = self.capture(&args)?;
        Ok(parse_listing(path, &output))
    }

    fn checkout(
        &self,
        url: &str,
        dest: &Path,
        depth: Depth,
        revision: Revision,
        notify: &mut dyn FnMut(Notification),
    ) -> Result<()> {
        let args = [
            "checkout".to_owned(),
            "--non-interactive".to_owned(),
            "--depth".to_owned(),
            depth.as_arg().to_owned(),
            "--revision".to_owned(),
            revision.to_string(),
            url.to_owned(),
            peg_safe(dest),
        ];
        self.stream(&args, notify)
    }

    fn update(
        &self,
        path: &Path,
        depth: Depth,
        revision: Revision,
        notify: &mut dyn FnMut(Notification),
    ) -> Result<()> {
        let args = [
            "update".to_owned(),
            "--non-interactive".to_owned(),
            "--set-depth".to_owned(),
            depth.as_arg().to_owned(),
            "--revision".to_owned(),
            revision.to_string(),
            peg_safe(path),
        ];
        self.stream(&args, notify)
    }
}

impl WorkingCopyClient for SvnClient {
    fn revert_recursive(&self, path: &Path) -> Result<()> {
        let args = [
            "revert".to_owned(),
            "--non-interactive".to_owned(),
            "--recursive".to_owned(),
            peg_safe(path),
        ];
        let output = self.capture(&args)?;
        for line in output.lines() {
            debug!("{line}");
        }
        Ok(())
    }

    fn unversioned_entries(&self, path: &Path) -> Result<Vec<UnversionedEntry>> {
        let args = [
            "status".to_owned(),
            "--non-interactive".to_owned(),
            "--no-ignore".to_owned(),
            peg_safe(path),
        ];
        let output = self.capture(&args)?;
        Ok(parse_unversioned(&output))
    }
}

/// Check that the `svn` binary can be executed
///
/// # Errors
///
/// Returns an error if the command is not found or fails
pub fn check_svn_availability(program: &str) -> Result<()> {
    let output = Command::new(program)
        .args(["--version", "--quiet"])
        .output()
        .map_err(|e| {
            SparseError::remote(format!(
                "{program} command not found ({e}). Please ensure Subversion is installed and available in PATH"
            ))
        })?;

    if !output.status.success() {
        return Err(SparseError::remote(format!("{program} failed to execute properly")).into());
    }

    debug!(
        "Using svn {}",
        String::from_utf8_lossy(&output.stdout).trim()
    );
    Ok(())
}

/// Split `svn list` output into directories (trailing `/`) and files
#[must_use]
pub fn parse_listing(path: &NormalizedPath, output: &str) -> RemoteListing {
    let mut listing = RemoteListing {
        path: path.clone(),
        ..RemoteListing::default()
    };

    for line in output.lines() {
        let entry = line.trim_end_matches(['\r', '\n']);
        if entry.is_empty() {
            continue;
        }
        if let Some(directory) = entry.strip_suffix('/') {
            listing.directories.insert(directory.to_owned());
        } else {
            listing.files.insert(entry.to_owned());
        }
    }

    listing
}

/// Translate one line of `svn checkout`/`svn update` output
#[must_use]
pub fn parse_notification(line: &str) -> Option<Notification> {
    if let Some(path) = quoted_after(line, "Restored ") {
        return Some(Notification::new(NotifyAction::Restore, path));
    }
    if let Some(path) = quoted_after(line, "Reverted ") {
        return Some(Notification::new(NotifyAction::Revert, path));
    }
    if let Some(path) = quoted_after(line, "Fetching external item into ") {
        return Some(Notification::new(NotifyAction::External, path));
    }
    if let Some(path) = quoted_after(line, "Updating ") {
        return Some(Notification::new(NotifyAction::UpdateStarted, path));
    }
    if let Some(path) = quoted_after(line, "Skipped ") {
        return Some(Notification::new(NotifyAction::Skip, path));
    }
    if line.starts_with("At revision")
        || line.starts_with("Updated to revision")
        || line.starts_with("Checked out revision")
        || line.starts_with("Updated external to revision")
    {
        return Some(Notification::new(NotifyAction::Completed, ""));
    }

    // Status lines: content, property, lock and tree-conflict columns, then a space and the path
    let columns = line.get(..4)?;
    let path = line.get(4..)?.trim();
    if path.is_empty() || !line[4..].starts_with(' ') {
        return None;
    }
    let mut flags = columns.chars();
    let content = flags.next()?;
    let property = flags.next()?;

    let action = match (content, property) {
        ('A', _) => NotifyAction::Add,
        ('D', _) => NotifyAction::Delete,
        ('U' | 'G', _) | (' ', 'U' | 'G') => NotifyAction::Update,
        ('E', _) => NotifyAction::Exists,
        ('C', _) | (_, 'C') => NotifyAction::Conflict,
        _ => return None,
    };
    Some(Notification::new(action, normalize_separators(path)))
}

/// Pick the `?` and `I` lines out of `svn status` output
#[must_use]
pub fn parse_unversioned(output: &str) -> Vec<UnversionedEntry> {
    output
        .lines()
        .filter_map(|line| {
            let kind = match line.chars().next()? {
                '?' => UnversionedKind::Unversioned,
                'I' => UnversionedKind::Ignored,
                _ => return None,
            };
            let path = line.get(1..)?.trim();
            if path.is_empty() {
                return None;
            }
            Some(UnversionedEntry {
                kind,
                path: PathBuf::from(path),
            })
        })
        .collect()
}

/// Extract `path` from lines shaped like `<prefix>'path'` (optionally followed by `:`)
fn quoted_after(line: &str, prefix: &str) -> Option<String> {
    let rest = line.strip_prefix(prefix)?.trim_end().trim_end_matches(':');
    let inner = rest.strip_prefix('\'')?.strip_suffix('\'')?;
    Some(normalize_separators(inner))
}

/// Working-copy paths containing `@` need a trailing `@` so svn does not read a peg revision
fn peg_safe(path: &Path) -> String {
    let display = path.display().to_string();
    if display.contains('@') {
        format!("{display}@")
    } else {
        display
    }
}
