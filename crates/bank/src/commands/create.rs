use anyhow::Result;
use libbank::{BankConfig, Dialect, Manifest, Output, create_syncfile, ensure_sync_repo_dir};

/// Run the `bank create` command logic: create or overwrite the syncfile
/// with the current states of the given repositories. Returns whether every
/// repository's state was captured.
pub fn create(
    config: &BankConfig,
    repos: &[String],
    dry_run: bool,
    output: &dyn Output,
) -> Result<bool> {
    ensure_sync_repo_dir(&config.syncfile)?;

    // Overwriting an existing syncfile keeps its dialect; new files follow
    // the extension.
    let dialect = if config.syncfile.is_file() {
        Manifest::load(&config.syncfile)
            .map(|manifest| manifest.dialect())
            .unwrap_or_else(|_| Dialect::for_path(&config.syncfile))
    } else {
        Dialect::for_path(&config.syncfile)
    };

    let summary = create_syncfile(repos, &config.cwd, dialect, output)?;

    if dry_run {
        return Ok(true);
    }

    summary.manifest.save(&config.syncfile)?;
    output.detail(&format!(
        "wrote bank sync state to {}",
        config.syncfile.display()
    ))?;

    if summary.all_recorded {
        output.verdict(
            true,
            "success! all constituent repos had their state recorded.",
        )?;
        Ok(true)
    } else {
        output.verdict(
            false,
            "failure! not all constituent repos had their state recorded.",
        )?;
        Ok(false)
    }
}
