use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use anyhow::{Context, Result, ensure};

/// Return the path to the compiled `bank` binary for integration-style tests.
pub fn bank_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_bank"))
}

/// Run a git command inside `repo_path`, ensuring it succeeds.
pub fn git(repo_path: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new("git")
        .current_dir(repo_path)
        .args(args)
        .output()
        .with_context(|| format!("failed to run git {}", args.join(" ")))?;

    ensure!(
        output.status.success(),
        "git command failed: git {}\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    Ok(output)
}

/// Initialise a repository at `repo_path` without any commits.
pub fn init_repository(repo_path: &Path) -> Result<()> {
    if !repo_path.exists() {
        fs::create_dir_all(repo_path)?;
    }

    git(repo_path, &["init", "-b", "main"])?;
    git(repo_path, &["config", "user.email", "test@example.com"])?;
    git(repo_path, &["config", "user.name", "Test User"])?;

    Ok(())
}

/// Create a commit adding `file`, pinning the author date to `timestamp`.
/// Returns the new commit hash.
pub fn commit_at(repo_path: &Path, file: &str, timestamp: i64) -> Result<String> {
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
    head_of(repo_path)
}

/// Current `HEAD` hash of a repository.
pub fn head_of(repo_path: &Path) -> Result<String> {
    let output = git(repo_path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Lay out a bank under `root`: a `syncrepo` git repository holding the
/// syncfile, next to the constituent repositories. Returns the syncfile
/// path.
pub fn init_syncrepo(root: &Path) -> Result<PathBuf> {
    let syncrepo = root.join("syncrepo");
    init_repository(&syncrepo)?;
    Ok(syncrepo.join("syncfile.wl"))
}

/// Run `bank` from `root` with the provided arguments, returning the
/// command output.
pub fn run_bank(root: &Path, args: &[&str]) -> Result<Output> {
    let mut cmd = Command::new(bank_binary());
    cmd.current_dir(root);
    cmd.args(args);
    cmd.output()
        .with_context(|| format!("failed to run bank {}", args.join(" ")))
}

/// Decode captured stdout for assertions.
pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}
