use anyhow::Result;
use libbank::{
    BankConfig, Manifest, Output, Synchronizer, ensure_sync_repo_dir, ensure_syncfile,
};

/// Run the `bank sync` command logic. Returns whether every repository in
/// the bank synchronized; dry runs always report success and print no
/// verdict.
pub fn sync(config: &BankConfig, dry_run: bool, output: &dyn Output) -> Result<bool> {
    ensure_syncfile(&config.syncfile)?;
    ensure_sync_repo_dir(&config.syncfile)?;
    let manifest = Manifest::load(&config.syncfile)?;

    let synchronizer = Synchronizer::new(config.matching, config.cwd.clone(), dry_run, output);
    let summary = synchronizer.sync(&manifest)?;

    if summary.dry_run {
        return Ok(true);
    }

    if summary.all_synced {
        output.verdict(
            true,
            "success! all repos checked out to the specified sync state.",
        )?;
        Ok(true)
    } else {
        output.verdict(
            false,
            "failure! not all repos checked out to the specified sync state.",
        )?;
        Ok(false)
    }
}
