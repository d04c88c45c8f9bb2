#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Core library for synchronizing a bank of git repositories against a
//! syncfile manifest.
//!
//! The syncfile records, per repository, a target revision as a commit hash
//! and/or a Unix timestamp. This crate decodes the syncfile, resolves each
//! target against the repository's history (exact hash first, then
//! timestamp, with an optional closest-match fallback), performs the
//! checkout, and aggregates the per-repository outcomes into one result. It
//! can also capture the current state of a bank back into a syncfile.
//! The CLI binary in `crates/bank` builds on top of this library.

/// Resolved configuration for bank operations.
mod config;
/// Error types shared across the crate.
mod error;
/// Helper routines for interacting with git repositories.
mod git;
/// Syncfile decoding, encoding, and the manifest model.
mod manifest;
/// Output channel abstractions and implementations.
mod output;
/// Capturing current repository states back into a syncfile.
mod record;
/// Revision resolution for a single repository target.
mod resolve;
/// The bank-wide synchronization loop.
mod sync;

pub use config::{BankConfig, CONFIG_FILE_NAME, DEFAULT_SYNCFILE, DEFAULT_VERBOSITY};
pub use error::{BankError, Result};
pub use git::RepoPresence;
pub use manifest::{Dialect, Manifest, RepoTarget};
pub use output::{Output, Quiet, Terminal};
pub use record::{RecordSummary, create_syncfile, record_repos};
pub use resolve::{
    Attempt, CommitIndex, MatchPolicy, Method, Resolution, Resolver, SYNC_POINT_BRANCH,
    date_from_timestamp, short_sha,
};
pub use sync::{
    RepoOutcome, RepoReport, SyncSummary, Synchronizer, ensure_sync_repo_dir, ensure_syncfile,
};
