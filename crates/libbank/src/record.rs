use std::{io, path::Path};

use serde_json::Map;

use crate::{
    error::Result,
    git::{self, RepoPresence},
    manifest::{Dialect, Manifest, RepoTarget},
    output::Output,
    resolve::short_sha,
    sync::{padded, repo_location},
};

/// Result of capturing the current state of a bank.
#[derive(Debug)]
pub struct RecordSummary {
    /// Manifest reflecting the captured states, ready to be saved.
    pub manifest: Manifest,
    /// Whether every repository's state was captured.
    pub all_recorded: bool,
}

/// Build a [`RepoTarget`] from the current `HEAD` of the repository at
/// `location`, keeping the recorded (relative) path.
fn capture_target(recorded_path: &str, location: &Path) -> Result<RepoTarget> {
    let state = git::head_state(location)?;
    Ok(RepoTarget {
        path: recorded_path.to_string(),
        sha: Some(state.sha),
        unix_timestamp: Some(state.timestamp),
        date: Some(state.date),
        author: Some(state.author),
        message: Some(state.message),
        revision_number: state.revision_count.map(|count| count.to_string()),
        clone_url: state.clone_url,
        extra: Map::new(),
    })
}

/// Report a repository that is absent or not under git. Returns `true` when
/// the repository is usable.
fn report_presence(label: &str, location: &Path, output: &dyn Output) -> io::Result<bool> {
    match git::presence(location) {
        RepoPresence::Present => Ok(true),
        RepoPresence::MissingDirectory => {
            output.error(&format!(
                "{label}: there is no repository at {}.",
                location.display()
            ))?;
            Ok(false)
        }
        RepoPresence::NotARepository => {
            output.error(&format!(
                "{label}: {} is not a git repository.",
                location.display()
            ))?;
            Ok(false)
        }
    }
}

/// Rewrite every entry of `manifest` to the current revision of its
/// repository. Entries whose repository is missing or unreadable keep their
/// previous recorded state and flip the aggregate result to failure.
pub fn record_repos(
    manifest: &Manifest,
    cwd: &Path,
    output: &dyn Output,
) -> Result<RecordSummary> {
    let width = manifest.name_width();
    let mut entries = Vec::with_capacity(manifest.len());
    let mut all_recorded = true;

    for (name, target) in manifest.entries() {
        let label = padded(name, width);
        let location = repo_location(cwd, &target.path);

        if !report_presence(&label, &location, output)? {
            all_recorded = false;
            entries.push((name.clone(), target.clone()));
            continue;
        }

        match capture_target(&target.path, &location) {
            Ok(captured) => {
                let short = captured.sha.as_deref().map(short_sha).unwrap_or_default();
                let date = captured.date.clone().unwrap_or_default();
                output.ok(&format!(
                    "{label}: recording bank sync state of {short}, {date}."
                ))?;
                entries.push((name.clone(), captured));
            }
            Err(err) => {
                output.detail(&format!("{label}: {err}"))?;
                output.fail(&format!(
                    "{label}: failure! not able to get the status of {name} at {}",
                    location.display()
                ))?;
                all_recorded = false;
                entries.push((name.clone(), target.clone()));
            }
        }
    }

    Ok(RecordSummary {
        manifest: Manifest::new(entries, manifest.dialect()),
        all_recorded,
    })
}

/// Build a fresh manifest recording the current states of the given
/// repository paths. Repositories that are missing or unreadable are left
/// out of the manifest and flip the aggregate result to failure.
pub fn create_syncfile(
    repos: &[String],
    cwd: &Path,
    dialect: Dialect,
    output: &dyn Output,
) -> Result<RecordSummary> {
    let names: Vec<String> = repos.iter().map(|repo| repo_name(repo)).collect();
    let width = names
        .iter()
        .map(|name| name.chars().count())
        .max()
        .unwrap_or(0)
        + 1;

    let mut entries = Vec::with_capacity(repos.len());
    let mut all_recorded = true;

    for (repo, name) in repos.iter().zip(&names) {
        let label = padded(name, width);
        let location = repo_location(cwd, repo);

        if !report_presence(&label, &location, output)? {
            all_recorded = false;
            continue;
        }

        match capture_target(repo, &location) {
            Ok(captured) => {
                let short = captured.sha.as_deref().map(short_sha).unwrap_or_default();
                let date = captured.date.clone().unwrap_or_default();
                output.ok(&format!(
                    "{label}: recording repository state of {short}, {date}."
                ))?;
                entries.push((name.clone(), captured));
            }
            Err(err) => {
                output.detail(&format!("{label}: {err}"))?;
                output.fail(&format!(
                    "{label}: failure! not able to get the status of {name} at {}",
                    location.display()
                ))?;
                all_recorded = false;
            }
        }
    }

    Ok(RecordSummary {
        manifest: Manifest::new(entries, dialect),
        all_recorded,
    })
}

/// Repository name used as the manifest key: the final component of the
/// given path.
fn repo_name(repo: &str) -> String {
    Path::new(repo)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| repo.to_string())
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        path::{Path, PathBuf},
        process::Command,
    };

    use anyhow::{Context, Result, ensure};
    use tempfile::TempDir;

    use super::*;
    use crate::output::Quiet;

    fn git(repo_path: &Path, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .current_dir(repo_path)
            .args(args)
            .output()
            .with_context(|| format!("failed to run git {}", args.join(" ")))?;
        ensure!(
            output.status.success(),
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn init_repo(parent: &Path, name: &str) -> Result<PathBuf> {
        let repo_path = parent.join(name);
        fs::create_dir_all(&repo_path)?;
        git(&repo_path, &["init", "-b", "main"])?;
        git(&repo_path, &["config", "user.email", "test@example.com"])?;
        git(&repo_path, &["config", "user.name", "Test User"])?;
        Ok(repo_path)
    }

    fn commit_at(repo_path: &Path, file: &str, timestamp: i64) -> Result<String> {
        fs::write(repo_path.join(file), format!("contents of {file}"))?;
        git(repo_path, &["add", file])?;
        git(
            repo_path,
            &[
                "commit",
                "-m",
                &format!("add {file}"),
                "--date",
                &format!("@{timestamp} +0000"),
            ],
        )?;
        Ok(git(repo_path, &["rev-parse", "HEAD"])?.trim().to_string())
    }

    #[test]
    fn record_captures_current_head() -> Result<()> {
        let temp = TempDir::new()?;
        let repo = init_repo(temp.path(), "libA")?;
        commit_at(&repo, "a.txt", 1_000)?;
        let head = commit_at(&repo, "b.txt", 2_000)?;

        let manifest = Manifest::parse(
            r#"{"libA": {"path": "libA", "sha": "stale"}}"#,
            Path::new("syncfile.json"),
        )?;
        let summary = record_repos(&manifest, temp.path(), &Quiet)?;

        assert!(summary.all_recorded);
        let target = &summary.manifest.entries()[0].1;
        assert_eq!(target.sha.as_deref(), Some(head.as_str()));
        assert_eq!(target.unix_timestamp, Some(2_000));
        assert_eq!(target.revision_number.as_deref(), Some("2"));
        assert_eq!(target.message.as_deref(), Some("add b.txt"));
        Ok(())
    }

    #[test]
    fn record_keeps_previous_state_for_missing_repos() -> Result<()> {
        let temp = TempDir::new()?;
        let repo = init_repo(temp.path(), "libB")?;
        commit_at(&repo, "a.txt", 1_000)?;

        let manifest = Manifest::parse(
            r#"{"libA": {"path": "libA", "sha": "stale"}, "libB": {"path": "libB"}}"#,
            Path::new("syncfile.json"),
        )?;
        let summary = record_repos(&manifest, temp.path(), &Quiet)?;

        assert!(!summary.all_recorded);
        assert_eq!(summary.manifest.len(), 2);
        assert_eq!(
            summary.manifest.entries()[0].1.sha.as_deref(),
            Some("stale")
        );
        assert!(summary.manifest.entries()[1].1.sha.is_some());
        Ok(())
    }

    #[test]
    fn create_builds_manifest_from_repo_paths() -> Result<()> {
        let temp = TempDir::new()?;
        let repo_a = init_repo(temp.path(), "libA")?;
        let repo_b = init_repo(temp.path(), "nested/libB")?;
        let head_a = commit_at(&repo_a, "a.txt", 1_000)?;
        commit_at(&repo_b, "b.txt", 2_000)?;

        let repos = vec!["libA".to_string(), "nested/libB".to_string()];
        let summary = create_syncfile(&repos, temp.path(), Dialect::Decorated, &Quiet)?;

        assert!(summary.all_recorded);
        let names: Vec<_> = summary
            .manifest
            .entries()
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(names, ["libA", "libB"]);
        assert_eq!(
            summary.manifest.entries()[0].1.sha.as_deref(),
            Some(head_a.as_str())
        );
        assert_eq!(summary.manifest.entries()[1].1.path, "nested/libB");
        Ok(())
    }

    #[test]
    fn create_skips_missing_repos() -> Result<()> {
        let temp = TempDir::new()?;
        let repo = init_repo(temp.path(), "libA")?;
        commit_at(&repo, "a.txt", 1_000)?;

        let repos = vec!["libA".to_string(), "libMissing".to_string()];
        let summary = create_syncfile(&repos, temp.path(), Dialect::Decorated, &Quiet)?;

        assert!(!summary.all_recorded);
        assert_eq!(summary.manifest.len(), 1);
        Ok(())
    }
}
