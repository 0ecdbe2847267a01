use clap::{Parser, Subcommand};

/// Command-line arguments for svn-sparse
#[derive(Parser, Debug, Clone)]
#[command(name = "svn-sparse")]
#[command(about = "Maintain partial Subversion working copies from include/exclude profiles")]
#[command(long_about = None)]
#[command(version)]
pub struct Args {
    /// Settings file path
    #[arg(long, global = true, value_name = "PATH", env = "SVN_SPARSE_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create or update a sparse working copy from a profile
    Checkout(CheckoutArgs),

    /// Revert a working copy and delete unversioned and ignored files
    RevertAll(RevertAllArgs),

    /// Report which build configurations a change set makes stale
    CheckBuild(CheckBuildArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct CheckoutArgs {
    /// Repository URL to check out
    #[arg(value_name = "URL")]
    pub url: String,

    /// Local working-copy path
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Profile name or path (`.conf` is appended when missing)
    #[arg(long, short, value_name = "NAME")]
    pub profile: String,

    /// Pin the run to this revision instead of HEAD
    #[arg(long, short, value_name = "N")]
    pub revision: Option<String>,

    /// Preview operations without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Reset excluded paths that still hold local content
    #[arg(long)]
    pub reset_excluded: bool,

    /// Plan output format: text or json
    #[arg(
        long = "output-format",
        value_name = "FORMAT",
        default_value = "text",
        value_parser = ["text", "json"]
    )]
    pub output_format: String,
}

#[derive(Parser, Debug, Clone)]
pub struct RevertAllArgs {
    /// Working-copy path to clean
    #[arg(value_name = "PATH")]
    pub path: String,

    /// List what would be reverted and deleted without touching anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CheckBuildArgs {
    /// Root of the source tree
    #[arg(value_name = "ROOT")]
    pub root: String,

    /// File listing changed paths, one per line (`-` reads stdin)
    #[arg(long, value_name = "FILE")]
    pub changes: Option<String>,

    /// Directory holding the BWConfiguration_*.cmake files
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<String>,

    /// Report format: text or json
    #[arg(
        long = "output-format",
        value_name = "FORMAT",
        default_value = "text",
        value_parser = ["text", "json"]
    )]
    pub output_format: String,
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;

    #[test]
    fn test_parse_checkout() {
        let args = Args::try_parse_from([
            "svn-sparse",
            "checkout",
            "svn://host/trunk",
            "wc",
            "--profile",
            "client",
            "--dry-run",
            "--revision",
            "r42",
        ])
        .unwrap();

        let Command::Checkout(checkout) = args.command else {
            panic!("expected checkout");
        };
        assert_eq!(checkout.url, "svn://host/trunk");
        assert_eq!(checkout.path, "wc");
        assert_eq!(checkout.profile, "client");
        assert_eq!(checkout.revision.as_deref(), Some("r42"));
        assert!(checkout.dry_run);
        assert_eq!(checkout.output_format, "text");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "svn-sparse",
            "check-build",
            "/src",
            "--changes",
            "-",
            "--verbose",
            "--config",
            "alt.yaml",
        ])
        .unwrap();

        assert!(args.verbose);
        assert_eq!(args.config.as_deref(), Some("alt.yaml"));
        let Command::CheckBuild(check) = args.command else {
            panic!("expected check-build");
        };
        assert_eq!(check.changes.as_deref(), Some("-"));
    }

    #[test]
    fn test_parse_revert_all() {
        let args = Args::try_parse_from(["svn-sparse", "revert-all", "wc", "--dry-run"]).unwrap();
        let Command::RevertAll(revert) = args.command else {
            panic!("expected revert-all");
        };
        assert_eq!(revert.path, "wc");
        assert!(revert.dry_run);
    }

    #[test]
    fn test_checkout_requires_profile() {
        assert!(Args::try_parse_from(["svn-sparse", "checkout", "svn://host/trunk", "wc"]).is_err());
    }

    #[test]
    fn test_rejects_unknown_output_format() {
        assert!(
            Args::try_parse_from([
                "svn-sparse",
                "checkout",
                "svn://h/t",
                "wc",
                "-p",
                "x",
                "--output-format",
                "yaml"
            ])
            .is_err()
        );
    }
}
