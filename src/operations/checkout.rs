//! Sparse checkout coordination

use crate::cancel::CancellationToken;
use crate::config::Settings;
use crate::config::validation::validate_repository_url;
use crate::error::SparseError;
use crate::profile::{Profile, load_profile, resolve_profile_path};
use crate::remote::{ListingCache, RemoteClient, Revision};
use crate::sparse::{
    ExcludedContentPolicy, ExecutionMode, ExecutionSummary, Executor, LocalState, Plan,
    PlanBuilder, ProgressEvent, ProgressObserver,
};
use crate::system::System;
use crate::utils::fs::ensure_dir_exists;
use anyhow::{Context as _, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How the computed plan is reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(SparseError::configuration(format!(
                "Invalid output format '{s}'. Must be 'text' or 'json'"
            ))
            .into()),
        }
    }
}

/// Everything a checkout run needs to know
#[derive(Debug, Clone)]
pub struct CheckoutOptions {
    pub url: String,
    pub dest: PathBuf,
    pub profile: String,
    /// Pin the run to this revision instead of HEAD
    pub revision: Option<Revision>,
    pub dry_run: bool,
    pub reset_excluded: bool,
    pub output_format: OutputFormat,
    /// Log every progress event instead of showing a spinner
    pub verbose: bool,
    pub show_progress: bool,
}

/// What a run planned and applied
#[derive(Debug, Clone)]
pub struct CheckoutSummary {
    pub plan: Plan,
    pub execution: ExecutionSummary,
}

/// Coordinates one sparse checkout: resolve, plan, execute
#[non_exhaustive]
pub struct SparseCheckoutOperation<'src> {
    options: CheckoutOptions,
    profile: Profile,
    policy: ExcludedContentPolicy,
    system: &'src dyn System,
    remote: &'src dyn RemoteClient,
    cancel: CancellationToken,
}

impl<'src> SparseCheckoutOperation<'src> {
    /// Validate the request and load its profile
    ///
    /// # Errors
    ///
    /// Returns a configuration error if:
    /// - The repository URL is invalid
    /// - The profile cannot be found, read or parsed
    #[inline]
    pub fn new(
        mut options: CheckoutOptions,
        settings: &Settings,
        system: &'src dyn System,
        remote: &'src dyn RemoteClient,
        cancel: CancellationToken,
    ) -> Result<Self> {
        validate_repository_url(&options.url)?;

        if options.dest.is_relative() {
            let cwd = system.current_dir().map_err(|e| {
                SparseError::filesystem(format!("Cannot get current directory: {e}"))
            })?;
            options.dest = cwd.join(&options.dest);
        }

        let profile_path =
            resolve_profile_path(system, &options.profile, settings.profile_dir.as_deref())?;
        let profile = load_profile(system, &profile_path)?;
        if profile.is_empty() {
            warn!("Profile {} has no rules", profile_path.display());
        }

        let policy = if options.reset_excluded || settings.reset_excluded {
            ExcludedContentPolicy::Reset
        } else {
            ExcludedContentPolicy::Keep
        };

        Ok(Self {
            options,
            profile,
            policy,
            system,
            remote,
            cancel,
        })
    }

    /// Plan and apply (or preview) the checkout
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The HEAD revision cannot be resolved
    /// - Planning or execution fails or is cancelled
    #[inline]
    pub fn execute(&self) -> Result<CheckoutSummary> {
        let url = self.options.url.as_str();
        let dest = self.options.dest.as_path();

        let revision = match self.options.revision {
            Some(revision) => {
                debug!("Using pinned revision r{revision}");
                revision
            }
            None => self
                .remote
                .resolve_revision(url)
                .with_context(|| format!("Failed to resolve HEAD revision of {url}"))?,
        };
        info!("Planning sparse checkout of {url} at r{revision}");

        let plan = self.plan(revision)?;
        self.render(&plan)?;

        if plan.is_empty() {
            info!("\u{2713} {} already matches the profile", dest.display());
            return Ok(CheckoutSummary {
                plan,
                execution: ExecutionSummary::default(),
            });
        }

        let mode = if self.options.dry_run {
            info!("Dry run preview - no files will be modified:");
            ExecutionMode::DryRun
        } else {
            ExecutionMode::Apply
        };
        if mode == ExecutionMode::Apply
            && plan.create_root
            && let Some(parent) = dest.parent()
        {
            ensure_dir_exists(self.system, parent).map_err(|e| {
                SparseError::filesystem(format!("Cannot prepare {}: {e:#}", dest.display()))
            })?;
        }
        let executor = Executor::new(self.remote, url, dest, self.cancel.clone()).with_mode(mode);

        let execution = if mode == ExecutionMode::DryRun {
            executor.execute(&plan, None)?
        } else if self.options.verbose || !self.options.show_progress {
            let mut log_event = |event: &ProgressEvent| debug!("{} {}", event.kind, event.path);
            executor.execute(&plan, Some(&mut log_event))?
        } else {
            let mut spinner = Spinner::new(dest.display().to_string())?;
            let result = executor.execute(&plan, Some(&mut spinner));
            spinner.bar.finish_and_clear();
            result?
        };

        if mode == ExecutionMode::Apply {
            info!("\u{2713} Applied {} operations at r{revision}", execution.operations);
            info!("  Working copy changes: {}", execution.events);
        }

        Ok(CheckoutSummary { plan, execution })
    }

    fn plan(&self, revision: Revision) -> Result<Plan> {
        let local = LocalState::new(self.system, &self.options.dest);
        let cache = ListingCache::new(self.remote, &self.options.url, revision, self.cancel.clone());
        PlanBuilder::new(local, cache)
            .with_policy(self.policy)
            .build(&self.profile)
    }

    fn render(&self, plan: &Plan) -> Result<()> {
        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(plan)
                    .context("Failed to serialize the plan")?;
                // Output to stdout (not using logging)
                println!("{json}");
            }
            OutputFormat::Text => {
                for op in plan.operations() {
                    debug!("  {op}");
                }
            }
        }
        Ok(())
    }
}

/// Progress spinner fed by working-copy changes
struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    fn new(message: String) -> Result<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.green} {elapsed_precise:.green}  {pos} changes  {wide_msg}",
        )?;
        let bar = ProgressBar::new_spinner().with_style(style).with_message(message);
        bar.enable_steady_tick(Duration::from_millis(100));
        Ok(Self { bar })
    }
}

impl ProgressObserver for Spinner {
    fn on_event(&mut self, event: &ProgressEvent) {
        self.bar.inc(1);
        self.bar.set_message(format!("{} {}", event.kind, event.path));
    }
}
