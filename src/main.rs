//! # `svn-sparse`
//!
//! `svn-sparse` keeps a partial Subversion working copy in line with a
//! profile of included and excluded repository paths.
//!
//! ## Usage
//!
//! ```sh
//! svn-sparse checkout svn://host/project/trunk ./wc --profile client
//! svn-sparse checkout svn://host/project/trunk ./wc --profile client --dry-run --output-format json
//! svn-sparse check-build ./wc --changes changed.txt
//! ```
//!
//! Exit codes: 1 configuration, 2 remote, 3 filesystem, 130 cancelled.

use clap::Parser as _;
use svn_sparse::cancel::CancellationToken;
use svn_sparse::cli::Args;
use svn_sparse::error::SparseError;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let cancel = CancellationToken::new();
    if let Err(err) = cancel.install_interrupt_handler() {
        warn!("Interrupts will not cancel cleanly: {err}");
    }

    match svn_sparse::run(args, &cancel) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            error!("{:#}", err);
            std::process::exit(
                err.downcast_ref::<SparseError>()
                    .map_or(1, SparseError::exit_code),
            );
        }
    }
}
