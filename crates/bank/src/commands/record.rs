use anyhow::Result;
use libbank::{
    BankConfig, Manifest, Output, ensure_sync_repo_dir, ensure_syncfile, record_repos,
};

/// Run the `bank record` command logic: rewrite the syncfile so it matches
/// the current revisions of the referenced repositories. Returns whether
/// every repository's state was captured.
pub fn record(config: &BankConfig, dry_run: bool, output: &dyn Output) -> Result<bool> {
    ensure_syncfile(&config.syncfile)?;
    ensure_sync_repo_dir(&config.syncfile)?;
    let manifest = Manifest::load(&config.syncfile)?;

    let summary = record_repos(&manifest, &config.cwd, output)?;

    if dry_run {
        return Ok(true);
    }

    summary.manifest.save(&config.syncfile)?;
    output.detail(&format!(
        "wrote new bank sync state to {}",
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
