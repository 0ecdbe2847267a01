//! Per-run memoization of remote listings

use super::{RemoteClient, RemoteListing, Revision};
use crate::cancel::CancellationToken;
use crate::utils::NormalizedPath;
use anyhow::{Context as _, Result};
use std::collections::HashMap;
use tracing::debug;

/// Listings fetched during one planning run
///
/// Each distinct path is fetched at most once, always at the run's pinned
/// revision. A cache is created per run and dropped with it.
pub struct ListingCache<'run> {
    remote: &'run dyn RemoteClient,
    base_url: String,
    revision: Revision,
    cancel: CancellationToken,
    listings: HashMap<NormalizedPath, RemoteListing>,
}

impl<'run> ListingCache<'run> {
    #[must_use]
    pub fn new(
        remote: &'run dyn RemoteClient,
        base_url: &str,
        revision: Revision,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            remote,
            base_url: base_url.to_owned(),
            revision,
            cancel,
            listings: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    /// Number of distinct paths fetched so far
    #[must_use]
    pub fn fetched(&self) -> usize {
        self.listings.len()
    }

    /// Listing for `path`, fetched on first use
    ///
    /// # Errors
    ///
    /// Returns an error if the run was cancelled or the remote listing fails
    pub fn list(&mut self, path: &NormalizedPath) -> Result<&RemoteListing> {
        if !self.listings.contains_key(path) {
            self.cancel.check()?;
            debug!("Listing {path} at r{}", self.revision);
            let listing = self
                .remote
                .list(&self.base_url, path, self.revision)
                .with_context(|| {
                    format!("Failed to list {}", path.to_url(&self.base_url))
                })?;
            self.listings.insert(path.clone(), listing);
        }

        self.listings
            .get(path)
            .with_context(|| format!("Listing for {path} missing from cache"))
    }
}
