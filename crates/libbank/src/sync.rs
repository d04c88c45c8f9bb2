use std::path::{Path, PathBuf, absolute};

use crate::{
    error::{BankError, Result},
    git::{self, RepoPresence},
    manifest::{Manifest, RepoTarget},
    output::Output,
    resolve::{
        Attempt, MatchPolicy, Method, Resolution, Resolver, date_from_timestamp, short_sha,
    },
};

/// Outcome recorded for one repository during a synchronization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOutcome {
    /// The repository was checked out, exactly or approximately.
    Resolved(Resolution),
    /// Every applicable method failed; the repository was left untouched.
    Unresolved,
    /// The repository was not found on disk.
    Missing(RepoPresence),
    /// Dry run: the method that would have been attempted, if any.
    WouldAttempt(Option<Attempt>),
}

/// Per-repository record produced by a synchronization pass.
#[derive(Debug)]
pub struct RepoReport {
    /// Name of the repository in the syncfile.
    pub name: String,
    /// What happened to it.
    pub outcome: RepoOutcome,
}

/// Aggregate result of one synchronization pass over a bank.
#[derive(Debug)]
pub struct SyncSummary {
    /// Per-repository reports, in syncfile order.
    pub reports: Vec<RepoReport>,
    /// Whether every repository was present and resolved. Meaningless for
    /// dry runs, which never produce a verdict.
    pub all_synced: bool,
    /// Whether this pass was a dry run.
    pub dry_run: bool,
}

/// Verify that the syncfile exists.
pub fn ensure_syncfile(syncfile: &Path) -> Result<()> {
    if syncfile.is_file() {
        return Ok(());
    }
    Err(BankError::Syncfile {
        path: syncfile.to_path_buf(),
        message: "could not locate the sync file".to_string(),
    })
}

/// Verify that the directory holding the syncfile is itself a git repository
/// (the "syncrepo"), so the bank's recorded states are versioned.
pub fn ensure_sync_repo_dir(syncfile: &Path) -> Result<()> {
    let syncfile_abs = absolute(syncfile)?;
    let repo_dir = syncfile_abs.parent().ok_or_else(|| BankError::Syncfile {
        path: syncfile.to_path_buf(),
        message: "sync file has no parent directory".to_string(),
    })?;

    match git::presence(repo_dir) {
        RepoPresence::Present => Ok(()),
        RepoPresence::MissingDirectory => Err(BankError::Syncfile {
            path: syncfile.to_path_buf(),
            message: format!("could not locate the sync repo dir at {}", repo_dir.display()),
        }),
        RepoPresence::NotARepository => Err(BankError::Syncfile {
            path: syncfile.to_path_buf(),
            message: format!("{} is not a git repository", repo_dir.display()),
        }),
    }
}

/// Absolute location of a repository, from the working-directory prefix and
/// the path recorded in the syncfile.
pub(crate) fn repo_location(cwd: &Path, recorded_path: &str) -> PathBuf {
    let joined = cwd.join(recorded_path);
    absolute(&joined).unwrap_or(joined)
}

/// Left-align a repository name to the bank-wide label width.
pub(crate) fn padded(name: &str, width: usize) -> String {
    format!("{name:<width$}")
}

/// Display form of an optional first-parent revision count.
fn revision_display(revision: Option<u64>) -> String {
    match revision {
        Some(count) => count.to_string(),
        None => "(unknown)".to_string(),
    }
}

/// Applies a [`Resolver`] to every entry of a manifest, streaming per-repo
/// feedback and aggregating one overall result.
///
/// Repositories are processed sequentially in syncfile order; a failure in
/// one never aborts the batch, it only flips the aggregate verdict.
pub struct Synchronizer<'a> {
    /// Revision resolver shared across the bank.
    resolver: Resolver,
    /// Working-directory prefix applied to recorded repository paths.
    cwd: PathBuf,
    /// When set, report intent without touching any repository.
    dry_run: bool,
    /// Sink for streamed progress lines.
    output: &'a dyn Output,
}

impl<'a> Synchronizer<'a> {
    /// Create a synchronizer with an explicit matching policy and working
    /// directory prefix.
    pub fn new(
        policy: MatchPolicy,
        cwd: impl Into<PathBuf>,
        dry_run: bool,
        output: &'a dyn Output,
    ) -> Self {
        Self {
            resolver: Resolver::new(policy),
            cwd: cwd.into(),
            dry_run,
            output,
        }
    }

    /// Process every repository in the manifest and aggregate the result.
    pub fn sync(&self, manifest: &Manifest) -> Result<SyncSummary> {
        let width = manifest.name_width();
        let mut reports = Vec::with_capacity(manifest.len());
        let mut all_synced = true;

        for (name, target) in manifest.entries() {
            let label = padded(name, width);
            let location = repo_location(&self.cwd, &target.path);

            let outcome = self.sync_repo(&label, &location, target)?;
            self.render(&label, &location, target, &outcome)?;

            if matches!(outcome, RepoOutcome::Unresolved | RepoOutcome::Missing(_)) {
                all_synced = false;
            }
            reports.push(RepoReport {
                name: name.clone(),
                outcome,
            });
        }

        Ok(SyncSummary {
            reports,
            all_synced,
            dry_run: self.dry_run,
        })
    }

    /// Process a single repository. Resolution errors are converted into an
    /// unresolved outcome here so they never cross the repository boundary;
    /// only I/O failures on the output stream propagate.
    fn sync_repo(
        &self,
        label: &str,
        location: &Path,
        target: &RepoTarget,
    ) -> Result<RepoOutcome> {
        match git::presence(location) {
            RepoPresence::Present => {}
            missing => return Ok(RepoOutcome::Missing(missing)),
        }

        if self.dry_run {
            return Ok(RepoOutcome::WouldAttempt(
                self.resolver.planned_attempt(target),
            ));
        }

        let resolution = match self.resolver.resolve(location, label, target, self.output) {
            Ok(resolution) => resolution,
            Err(BankError::Io(err)) => return Err(err.into()),
            Err(err) => {
                self.output.detail(&format!("{label}: {err}"))?;
                Resolution::Unresolved
            }
        };

        Ok(match resolution {
            Resolution::Unresolved => RepoOutcome::Unresolved,
            resolved => RepoOutcome::Resolved(resolved),
        })
    }

    /// Stream the report line(s) for one repository.
    fn render(
        &self,
        label: &str,
        location: &Path,
        target: &RepoTarget,
        outcome: &RepoOutcome,
    ) -> Result<()> {
        let out = self.output;
        match outcome {
            RepoOutcome::Missing(RepoPresence::MissingDirectory) => {
                out.error(&format!(
                    "{label}: there is no repository at {}.",
                    location.display()
                ))?;
            }
            RepoOutcome::Missing(_) => {
                out.error(&format!(
                    "{label}: {} is not a git repository.",
                    location.display()
                ))?;
            }
            RepoOutcome::WouldAttempt(Some(attempt)) => {
                out.message(&format!(
                    "{label}: would try and check out revision by {}: {}",
                    attempt.method, attempt.target
                ))?;
            }
            RepoOutcome::WouldAttempt(None) => {
                out.message(&format!(
                    "{label}: no usable revision is recorded for this repo."
                ))?;
            }
            RepoOutcome::Resolved(Resolution::Exact {
                method: Method::Sha,
                commit,
                revision,
            }) => {
                out.ok(&format!(
                    "{label}: successfully checked out revision by sha: {} (revision number {})",
                    short_sha(commit),
                    revision_display(*revision)
                ))?;
            }
            RepoOutcome::Resolved(Resolution::Exact {
                method: Method::Timestamp,
                commit,
                revision,
            }) => {
                let timestamp = target.unix_timestamp.unwrap_or_default();
                out.ok(&format!(
                    "{label}: successfully checked out revision by timestamp: {timestamp} ({}) {commit} (revision number {})",
                    date_from_timestamp(timestamp),
                    revision_display(*revision)
                ))?;
            }
            RepoOutcome::Resolved(Resolution::Approximate {
                commit,
                requested,
                used,
                revision,
            }) => {
                out.warn(&format!(
                    "{label}: warning checking out revision by closest timestamp."
                ))?;
                out.warn(&format!(
                    "       requested timestamp: {requested} ({})",
                    date_from_timestamp(*requested)
                ))?;
                out.warn(&format!(
                    "       used      timestamp: {used} ({}) {commit} (revision number {})",
                    date_from_timestamp(*used),
                    revision_display(*revision)
                ))?;
            }
            RepoOutcome::Resolved(Resolution::Unresolved) | RepoOutcome::Unresolved => {
                out.fail(&format!(
                    "{label}: failed to check out specified revision by any method."
                ))?;
            }
        }
        Ok(())
    }
}
