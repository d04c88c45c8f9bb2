use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use libbank::MatchPolicy;

/// Extended help shown below the option listing.
const LONG_ABOUT: &str = "\
bank is a command line utility to check out or record a synchronized state \
across a collection (a bank) of git repositories. The information about the \
repositories in the bank is specified in a syncfile. The syncfile lives \
inside a normal git repo which we call the syncrepo, so the bank's recorded \
states are themselves versioned.

Using bank allows a more general way to handle sub-repositories. It is \
intended to be less brittle than traditional ways to specify submodules by \
allowing some looseness / decoupling.

All of the options, e.g. the --syncfile option, the --cwd option, etc., can \
be specified in a bankconfig.toml file next to the bank so they do not need \
to be given each time on the command line.";

#[derive(Parser)]
#[command(name = "bank", version, about, long_about = LONG_ABOUT)]
#[command(group(
    ArgGroup::new("color_mode")
        .args(["color", "no_color"])
))]
/// Top-level CLI options for bank.
pub struct Cli {
    /// The path to the syncfile
    #[arg(long, global = true, value_name = "SYNCFILE")]
    pub syncfile: Option<PathBuf>,

    /// Prefix / change the working directory for the repos in the syncfile
    #[arg(long, global = true, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Level of reported feedback: 1 (minimal) to 4 (full)
    #[arg(long, global = true, value_name = "NUM", value_parser = clap::value_parser!(u8).range(1..=4))]
    pub verbosity: Option<u8>,

    /// Enable colored output
    #[arg(long, global = true)]
    pub color: bool,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Print what would happen instead of performing the command
    #[arg(long = "dry-run", global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    /// The primary command to execute.
    pub command: Commands,
}

#[derive(Subcommand)]
/// CLI subcommands supported by bank.
pub enum Commands {
    /// Check out / update the repos given in the syncfile to the states
    /// given in the syncfile
    Sync {
        /// Specify how a revision "match" is recognized
        #[arg(long, value_name = "MATCH")]
        matching: Option<MatchingMode>,
    },

    /// Alter the syncfile so it matches the current revisions of the
    /// referenced repositories
    Record,

    /// Create or overwrite the syncfile to record the current states of the
    /// given repos
    Create {
        /// The repos to be included in the bank
        #[arg(value_name = "REPO", required = true)]
        repos: Vec<String>,
    },
}

/// Matching policy as spelled on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MatchingMode {
    /// Only the recorded commit hash is acceptable.
    #[value(name = "shaOnly")]
    ShaOnly,
    /// The hash, or an exact author-timestamp match.
    #[value(name = "timestamp")]
    Timestamp,
    /// The hash, an exact timestamp, or the closest timestamp.
    #[value(name = "closetimestamp")]
    CloseTimestamp,
}

impl From<MatchingMode> for MatchPolicy {
    fn from(mode: MatchingMode) -> Self {
        match mode {
            MatchingMode::ShaOnly => Self::ShaOnly,
            MatchingMode::Timestamp => Self::Timestamp,
            MatchingMode::CloseTimestamp => Self::CloseTimestamp,
        }
    }
}
