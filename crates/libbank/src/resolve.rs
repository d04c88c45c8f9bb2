use std::{fmt, path::Path, str::FromStr};

use chrono::{Local, LocalResult, TimeZone};

use crate::{
    error::{BankError, Result},
    git,
    manifest::RepoTarget,
    output::Output,
};

/// Name of the branch created or reset at the resolved commit.
pub const SYNC_POINT_BRANCH: &str = "syncPoint";

/// How a revision "match" is recognized when resolving a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Only the recorded commit hash is acceptable.
    ShaOnly,
    /// The hash, or a commit whose author timestamp matches exactly.
    Timestamp,
    /// The hash, an exact timestamp match, or failing that the commit whose
    /// timestamp is closest to the recorded one.
    #[default]
    CloseTimestamp,
}

impl MatchPolicy {
    /// Whether this policy permits the timestamp method at all.
    fn allows_timestamp(self) -> bool {
        !matches!(self, Self::ShaOnly)
    }
}

impl FromStr for MatchPolicy {
    type Err = BankError;

    fn from_str(text: &str) -> Result<Self> {
        match text {
            "shaOnly" => Ok(Self::ShaOnly),
            "timestamp" => Ok(Self::Timestamp),
            "closetimestamp" => Ok(Self::CloseTimestamp),
            other => Err(BankError::Config(format!(
                "unknown matching mode '{other}' (expected shaOnly, timestamp or closetimestamp)"
            ))),
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ShaOnly => "shaOnly",
            Self::Timestamp => "timestamp",
            Self::CloseTimestamp => "closetimestamp",
        };
        write!(formatter, "{text}")
    }
}

/// Resolution method, in the fixed order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Exact commit hash.
    Sha,
    /// Author timestamp.
    Timestamp,
}

impl fmt::Display for Method {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Sha => "sha",
            Self::Timestamp => "timestamp",
        };
        write!(formatter, "{text}")
    }
}

/// Outcome of resolving one repository target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The target was checked out exactly as recorded.
    Exact {
        /// Method that produced the match.
        method: Method,
        /// Commit the sync point now sits on.
        commit: String,
        /// Display-only first-parent revision count, when computable.
        revision: Option<u64>,
    },
    /// No commit carried the recorded timestamp; the nearest one was checked
    /// out instead. Callers must surface this as a warning since it deviates
    /// from the syncfile's recorded intent.
    Approximate {
        /// Commit the sync point now sits on.
        commit: String,
        /// Timestamp recorded in the syncfile.
        requested: i64,
        /// Timestamp of the commit actually used.
        used: i64,
        /// Display-only first-parent revision count, when computable.
        revision: Option<u64>,
    },
    /// Every applicable method was exhausted without success.
    Unresolved,
}

impl Resolution {
    /// Whether the target ended up checked out, exactly or approximately.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

/// The method and target a dry run reports it would attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// Method that would be attempted first.
    pub method: Method,
    /// Human-readable rendering of the target revision.
    pub target: String,
}

/// Index of every commit reachable from any ref in a repository, keyed by
/// author timestamp. Built lazily, only when a timestamp method runs, and
/// never shared between repositories.
#[derive(Debug, Default)]
pub struct CommitIndex {
    /// `(timestamp, hash)` pairs in history enumeration order. Timestamps
    /// may repeat; the lookup rules below disambiguate.
    entries: Vec<(i64, String)>,
}

impl CommitIndex {
    /// Build an index from raw `(timestamp, hash)` pairs.
    pub fn new(entries: Vec<(i64, String)>) -> Self {
        Self { entries }
    }

    /// Build the index for the repository at `repo_path`. Failure to list
    /// history is a hard error: without it no timestamp match is possible.
    pub fn load(repo_path: &Path) -> Result<Self> {
        Ok(Self::new(git::commit_times(repo_path)?))
    }

    /// Number of indexed commits.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no commits.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hash of a commit carrying exactly `timestamp`. When several commits
    /// share the timestamp the last-enumerated one wins.
    pub fn exact(&self, timestamp: i64) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(entry_ts, _)| *entry_ts == timestamp)
            .map(|(_, hash)| hash.as_str())
    }

    /// The entry whose timestamp has minimum absolute distance from
    /// `timestamp`. Equidistant candidates resolve to the first-enumerated
    /// entry, which is deterministic for a given history.
    pub fn closest(&self, timestamp: i64) -> Option<(i64, &str)> {
        let mut best: Option<(i64, &str)> = None;
        for (entry_ts, hash) in &self.entries {
            let replace = match best {
                None => true,
                Some((best_ts, _)) => entry_ts.abs_diff(timestamp) < best_ts.abs_diff(timestamp),
            };
            if replace {
                best = Some((*entry_ts, hash.as_str()));
            }
        }
        best
    }
}

/// Render a Unix timestamp as a local date for human output.
pub fn date_from_timestamp(timestamp: i64) -> String {
    match Local.timestamp_opt(timestamp, 0) {
        LocalResult::Single(date) => date.format("%Y-%m-%d %H:%M:%S").to_string(),
        _ => format!("@{timestamp}"),
    }
}

/// Shorten a commit hash for display.
pub fn short_sha(sha: &str) -> String {
    sha.chars().take(12).collect()
}

/// Decides which commit a repository should be checked out to for a given
/// syncfile target.
///
/// Methods are attempted in a fixed order — exact hash first, then the
/// author timestamp — and the first success wins. A failed checkout falls
/// through to the next method; it is never retried.
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    /// Matching policy applied to the timestamp method.
    policy: MatchPolicy,
}

impl Resolver {
    /// Create a resolver with the given matching policy.
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    /// The method and target that would be attempted first for `target`,
    /// derived from the syncfile contents alone. Used by dry runs, which must
    /// not touch repository history.
    pub fn planned_attempt(&self, target: &RepoTarget) -> Option<Attempt> {
        if let Some(sha) = &target.sha {
            return Some(Attempt {
                method: Method::Sha,
                target: short_sha(sha),
            });
        }
        if let Some(timestamp) = target.unix_timestamp
            && self.policy.allows_timestamp()
        {
            return Some(Attempt {
                method: Method::Timestamp,
                target: format!("{timestamp} ({})", date_from_timestamp(timestamp)),
            });
        }
        None
    }

    /// Resolve `target` against the repository at `repo_path`, pointing the
    /// sync point branch at the selected commit.
    ///
    /// `label` prefixes the per-method detail lines emitted through `out`.
    /// Soft failures (a checkout that exits nonzero, a method whose field is
    /// absent) fall through; only a failure to enumerate history is an error.
    pub fn resolve(
        &self,
        repo_path: &Path,
        label: &str,
        target: &RepoTarget,
        out: &dyn Output,
    ) -> Result<Resolution> {
        if let Some(sha) = &target.sha {
            let checkout = git::checkout_at(repo_path, SYNC_POINT_BRANCH, sha)?;
            if checkout.success() {
                return Ok(Resolution::Exact {
                    method: Method::Sha,
                    commit: sha.clone(),
                    revision: git::revision_count(repo_path),
                });
            }
            trace_output(out, &checkout.stderr)?;
            out.detail(&format!(
                "{label}: failed to check out revision by sha: {sha}"
            ))?;
        }

        if let Some(timestamp) = target.unix_timestamp
            && self.policy.allows_timestamp()
        {
            let index = CommitIndex::load(repo_path)?;
            if let Some(resolution) = self.resolve_by_timestamp(repo_path, timestamp, &index, out)?
            {
                return Ok(resolution);
            }
            out.detail(&format!(
                "{label}: failed to check out revision by timestamp: {timestamp} ({})",
                date_from_timestamp(timestamp)
            ))?;
        }

        Ok(Resolution::Unresolved)
    }

    /// Attempt the timestamp method against a built index. Returns `None`
    /// when the method fails softly.
    fn resolve_by_timestamp(
        &self,
        repo_path: &Path,
        timestamp: i64,
        index: &CommitIndex,
        out: &dyn Output,
    ) -> Result<Option<Resolution>> {
        if let Some(hash) = index.exact(timestamp) {
            let hash = hash.to_string();
            let checkout = git::checkout_at(repo_path, SYNC_POINT_BRANCH, &hash)?;
            if checkout.success() {
                return Ok(Some(Resolution::Exact {
                    method: Method::Timestamp,
                    commit: hash,
                    revision: git::revision_count(repo_path),
                }));
            }
            trace_output(out, &checkout.stderr)?;
            return Ok(None);
        }

        if self.policy != MatchPolicy::CloseTimestamp {
            return Ok(None);
        }

        let Some((used, hash)) = index.closest(timestamp) else {
            return Ok(None);
        };
        let hash = hash.to_string();
        let checkout = git::checkout_at(repo_path, SYNC_POINT_BRANCH, &hash)?;
        if checkout.success() {
            return Ok(Some(Resolution::Approximate {
                commit: hash,
                requested: timestamp,
                used,
                revision: git::revision_count(repo_path),
            }));
        }
        trace_output(out, &checkout.stderr)?;
        Ok(None)
    }
}

/// Forward raw subprocess output to the highest verbosity tier, skipping
/// empty captures.
fn trace_output(out: &dyn Output, raw: &str) -> Result<()> {
    let raw = raw.trim();
    if !raw.is_empty() {
        out.trace(raw)?;
    }
    Ok(())
}
