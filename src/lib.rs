//! `svn-sparse` - Maintain partial Subversion working copies
//!
//! A profile lists paths to include and exclude from a repository. This
//! library turns a profile into a minimal plan of depth changes (a root
//! checkout, empty placeholders, fully materialized subtrees) using only
//! targeted remote listings, then applies that plan through the `svn`
//! client. It can also return a working copy to a pristine state and report
//! which build configurations a change set makes stale.

pub mod build;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod operations;
pub mod profile;
pub mod remote;
pub mod sparse;
pub mod system;
pub mod utils;

use anyhow::Result;
use cancel::CancellationToken;
use cli::{Args, CheckBuildArgs, CheckoutArgs, Command, RevertAllArgs};
use config::{DEFAULT_CONFIG_PATH, Settings};
use operations::{
    BuildCheckOperation, ChangeSource, CheckoutOptions, OutputFormat, RevertAllOperation,
    SparseCheckoutOperation,
};
use remote::svn::{SvnClient, check_svn_availability};
use sparse::ExecutionMode;
use std::path::{Path, PathBuf};
use system::{RealSystem, System};

/// Main entry point for the svn-sparse library
///
/// # Errors
///
/// Returns the first error of the selected command
pub fn run(args: Args, cancel: &CancellationToken) -> Result<()> {
    let system = RealSystem::new();
    let explicit = args.config.is_some();
    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let settings = Settings::load(&system, config_path, explicit)?;

    match args.command {
        Command::Checkout(checkout) => {
            run_checkout(checkout, args.verbose, &settings, &system, cancel)
        }
        Command::RevertAll(revert) => run_revert_all(&revert, &settings, &system, cancel),
        Command::CheckBuild(check) => run_check_build(&check, &settings, &system),
    }
}

fn run_checkout(
    args: CheckoutArgs,
    verbose: bool,
    settings: &Settings,
    system: &dyn System,
    cancel: &CancellationToken,
) -> Result<()> {
    let options = CheckoutOptions {
        url: args.url,
        dest: PathBuf::from(args.path),
        profile: args.profile,
        revision: args.revision.as_deref().map(str::parse).transpose()?,
        dry_run: args.dry_run,
        reset_excluded: args.reset_excluded,
        output_format: args.output_format.parse::<OutputFormat>()?,
        verbose,
        show_progress: true,
    };

    let client = SvnClient::new(&settings.svn, cancel.clone());
    let operation =
        SparseCheckoutOperation::new(options, settings, system, &client, cancel.clone())?;
    check_svn_availability(&settings.svn)?;
    operation.execute()?;
    Ok(())
}

fn run_revert_all(
    args: &RevertAllArgs,
    settings: &Settings,
    system: &dyn System,
    cancel: &CancellationToken,
) -> Result<()> {
    let mode = if args.dry_run {
        ExecutionMode::DryRun
    } else {
        ExecutionMode::Apply
    };

    let client = SvnClient::new(&settings.svn, cancel.clone());
    let operation =
        RevertAllOperation::new(Path::new(&args.path), mode, system, &client, cancel.clone())?;
    check_svn_availability(&settings.svn)?;
    operation.execute()?;
    Ok(())
}

fn run_check_build(args: &CheckBuildArgs, settings: &Settings, system: &dyn System) -> Result<()> {
    let config_dir = args
        .config_dir
        .as_deref()
        .map(Path::new)
        .or(settings.build_config_dir.as_deref());

    let operation = BuildCheckOperation::new(
        Path::new(&args.root),
        config_dir,
        ChangeSource::from_arg(args.changes.as_deref()),
        args.output_format.parse::<OutputFormat>()?,
        system,
    );
    operation.execute()?;
    Ok(())
}
