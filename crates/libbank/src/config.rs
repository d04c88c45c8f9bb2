use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    error::{BankError, Result},
    resolve::MatchPolicy,
};

/// Name of the optional per-bank configuration file.
pub const CONFIG_FILE_NAME: &str = "bankconfig.toml";

/// Syncfile used when neither the config file nor the command line names one.
pub const DEFAULT_SYNCFILE: &str = "syncfile.wl";

/// Feedback level used when none is configured.
pub const DEFAULT_VERBOSITY: u8 = 2;

/// Resolved configuration handed to the library entry points.
///
/// Values are merged once, in increasing precedence: built-in defaults, the
/// `bankconfig.toml` next to the bank, then command-line flags. Nothing in
/// the library reads configuration ambiently.
#[derive(Debug, Clone)]
pub struct BankConfig {
    /// Working-directory prefix applied to repository paths from the
    /// syncfile.
    pub cwd: PathBuf,
    /// Path of the syncfile describing the bank.
    pub syncfile: PathBuf,
    /// Feedback level, 1 (minimal) to 4 (full).
    pub verbosity: u8,
    /// Whether to colorize output; `None` means auto-detect from the
    /// terminal.
    pub colorize: Option<bool>,
    /// Matching policy applied by `sync`.
    pub matching: MatchPolicy,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            cwd: PathBuf::from("."),
            syncfile: PathBuf::from(DEFAULT_SYNCFILE),
            verbosity: DEFAULT_VERBOSITY,
            colorize: None,
            matching: MatchPolicy::default(),
        }
    }
}

/// On-disk shape of `bankconfig.toml`. Every field is optional; absent
/// values fall back to the defaults.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    /// The `[general]` section.
    #[serde(default)]
    general: GeneralSection,
    /// The `[sync]` section.
    #[serde(default)]
    sync: SyncSection,
}

/// The `[general]` section of `bankconfig.toml`.
#[derive(Debug, Default, Deserialize)]
struct GeneralSection {
    /// Working-directory prefix for repository paths.
    cwd: Option<String>,
    /// Syncfile path.
    syncfile: Option<String>,
    /// Feedback level.
    verbosity: Option<u8>,
    /// Colorize output.
    colorize: Option<bool>,
}

/// The `[sync]` section of `bankconfig.toml`.
#[derive(Debug, Default, Deserialize)]
struct SyncSection {
    /// Matching policy name.
    matching: Option<String>,
}

impl BankConfig {
    /// Load the configuration for a bank rooted at `dir`, overlaying
    /// `bankconfig.toml` onto the defaults when the file exists.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut config = Self::default();
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(config);
        }

        let text = fs::read_to_string(&path)?;
        let file: ConfigFile = toml::from_str(&text)
            .map_err(|err| BankError::Config(format!("{}: {err}", path.display())))?;
        config.apply(file)?;
        Ok(config)
    }

    /// Overlay values from a parsed config file.
    fn apply(&mut self, file: ConfigFile) -> Result<()> {
        if let Some(cwd) = file.general.cwd {
            self.cwd = PathBuf::from(cwd);
        }
        if let Some(syncfile) = file.general.syncfile {
            self.syncfile = PathBuf::from(syncfile);
        }
        if let Some(verbosity) = file.general.verbosity {
            self.verbosity = verbosity;
        }
        if let Some(colorize) = file.general.colorize {
            self.colorize = Some(colorize);
        }
        if let Some(matching) = file.sync.matching {
            self.matching = matching.parse()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults_apply_without_a_config_file() {
        let temp = TempDir::new().unwrap();
        let config = BankConfig::load(temp.path()).unwrap();

        assert_eq!(config.syncfile, PathBuf::from(DEFAULT_SYNCFILE));
        assert_eq!(config.verbosity, DEFAULT_VERBOSITY);
        assert_eq!(config.colorize, None);
        assert_eq!(config.matching, MatchPolicy::CloseTimestamp);
    }

    #[test]
    fn config_file_overlays_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            r#"
[general]
cwd = ".."
syncfile = "states.wl"
verbosity = 3
colorize = false

[sync]
matching = "timestamp"
"#,
        )
        .unwrap();

        let config = BankConfig::load(temp.path()).unwrap();
        assert_eq!(config.cwd, PathBuf::from(".."));
        assert_eq!(config.syncfile, PathBuf::from("states.wl"));
        assert_eq!(config.verbosity, 3);
        assert_eq!(config.colorize, Some(false));
        assert_eq!(config.matching, MatchPolicy::Timestamp);
    }

    #[test]
    fn partial_config_keeps_remaining_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "[general]\nverbosity = 4\n",
        )
        .unwrap();

        let config = BankConfig::load(temp.path()).unwrap();
        assert_eq!(config.verbosity, 4);
        assert_eq!(config.syncfile, PathBuf::from(DEFAULT_SYNCFILE));
    }

    #[test]
    fn unknown_matching_mode_is_a_config_error() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "[sync]\nmatching = \"fuzzy\"\n",
        )
        .unwrap();

        let result = BankConfig::load(temp.path());
        assert!(matches!(result, Err(BankError::Config(_))));
    }
}
