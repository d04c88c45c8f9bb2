use std::{
    path::Path,
    process::{Command, Output},
};

use crate::error::{BankError, Result};

/// Captured output of a git invocation.
#[derive(Debug)]
pub struct GitOutput {
    /// Process exit code; `-1` when the process was terminated by a signal.
    pub code: i32,
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
}

impl GitOutput {
    /// Whether the invocation exited with status zero.
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

impl From<Output> for GitOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Run a git command with the given argument vector in the specified
/// directory. A nonzero exit status is returned as a value; only a failure to
/// spawn the process at all is an error.
fn exec_git(repo_path: &Path, args: &[&str]) -> Result<GitOutput> {
    let output = Command::new("git")
        .current_dir(repo_path)
        .args(args)
        .output()
        .map_err(|err| {
            BankError::Git(format!("failed to execute git {}: {err}", args.join(" ")))
        })?;
    Ok(GitOutput::from(output))
}

/// Run a git command, treating a nonzero exit status as an error carrying the
/// full command details.
fn run_git(repo_path: &Path, args: &[&str]) -> Result<GitOutput> {
    let output = exec_git(repo_path, args)?;
    if !output.success() {
        return Err(BankError::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            output.stderr.trim()
        )));
    }
    Ok(output)
}

/// Whether a path holds a usable git repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoPresence {
    /// The path is a directory containing git metadata.
    Present,
    /// The path does not exist or is not a directory.
    MissingDirectory,
    /// The path is a directory but carries no git metadata.
    NotARepository,
}

/// Check whether `path` is a directory containing a `.git` entry.
///
/// A `.git` file (as written by worktrees) counts as metadata too.
pub fn presence(path: &Path) -> RepoPresence {
    if !path.is_dir() {
        return RepoPresence::MissingDirectory;
    }
    if !path.join(".git").exists() {
        return RepoPresence::NotARepository;
    }
    RepoPresence::Present
}

/// Create or reset the branch `branch` at `commit`, leaving it checked out.
/// A nonzero exit status means the commit could not be checked out and is
/// reported as a value so callers can fall back to another method.
pub fn checkout_at(repo_path: &Path, branch: &str, commit: &str) -> Result<GitOutput> {
    exec_git(repo_path, &["checkout", "-B", branch, commit])
}

/// List the `(author timestamp, commit hash)` pairs of every commit reachable
/// from any ref, in `git log --all` enumeration order.
pub fn commit_times(repo_path: &Path) -> Result<Vec<(i64, String)>> {
    let output = run_git(repo_path, &["log", "--all", "--format=%at %H"])?;

    let mut entries = Vec::new();
    for line in output.stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (timestamp, hash) = line.split_once(' ').ok_or_else(|| {
            BankError::Git(format!("unparsable git log line: {line:?}"))
        })?;
        let timestamp = timestamp.parse::<i64>().map_err(|_| {
            BankError::Git(format!("unparsable commit timestamp: {timestamp:?}"))
        })?;
        entries.push((timestamp, hash.to_string()));
    }
    Ok(entries)
}

/// Count the commits reachable from `HEAD` along the first-parent chain.
///
/// This ordinal is display-only; any failure is reported as `None` rather
/// than an error.
pub fn revision_count(repo_path: &Path) -> Option<u64> {
    let output = run_git(repo_path, &["rev-list", "HEAD", "--count", "--first-parent"]).ok()?;
    output.stdout.trim().parse().ok()
}

/// Snapshot of a repository's current `HEAD`, as recorded into a syncfile.
#[derive(Debug, Clone)]
pub struct HeadState {
    /// Full commit hash of `HEAD`.
    pub sha: String,
    /// Author timestamp of `HEAD`, seconds since epoch.
    pub timestamp: i64,
    /// Author date of `HEAD` in git's default human format.
    pub date: String,
    /// Author name of `HEAD`.
    pub author: String,
    /// Commit message, flattened to a single line.
    pub message: String,
    /// First-parent revision count, when it could be computed.
    pub revision_count: Option<u64>,
    /// Fetch URL of the `origin` remote, when one is configured.
    pub clone_url: Option<String>,
}

/// Capture the current state of the repository at `repo_path`.
pub fn head_state(repo_path: &Path) -> Result<HeadState> {
    let output = run_git(repo_path, &["log", "-1", "--format=%H%n%at%n%ad%n%an"])?;
    let mut lines = output.stdout.lines();
    let mut next_line = |field: &str| -> Result<String> {
        lines
            .next()
            .map(str::to_string)
            .ok_or_else(|| BankError::Git(format!("git log output missing {field}")))
    };
    let sha = next_line("commit hash")?;
    let timestamp = next_line("timestamp")?;
    let timestamp = timestamp
        .trim()
        .parse::<i64>()
        .map_err(|_| BankError::Git(format!("unparsable commit timestamp: {timestamp:?}")))?;
    let date = next_line("date")?;
    let author = next_line("author")?;

    let message = run_git(repo_path, &["log", "-1", "--format=%B"])?;
    let message = sanitize_message(&message.stdout);

    Ok(HeadState {
        sha,
        timestamp,
        date,
        author,
        message,
        revision_count: revision_count(repo_path),
        clone_url: origin_url(repo_path),
    })
}

/// Flatten a commit message to a single syncfile-friendly line: double quotes
/// become apostrophes and newlines become literal `\n` markers.
fn sanitize_message(message: &str) -> String {
    message.trim().replace('"', "'").replace('\n', "\\n")
}

/// Fetch URL of the `origin` remote, if any. Repositories without remotes are
/// common in a bank, so failures are not errors.
fn origin_url(repo_path: &Path) -> Option<String> {
    let output = run_git(repo_path, &["remote", "get-url", "origin"]).ok()?;
    let url = output.stdout.trim();
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}
