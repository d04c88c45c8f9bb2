use std::{io, path::PathBuf, result::Result as StdResult};

use thiserror::Error;

/// Custom Result type for bank operations.
pub type Result<T> = StdResult<T, BankError>;

/// Bank-specific error types
#[derive(Error, Debug)]
pub enum BankError {
    /// The syncfile could not be located, read, or decoded.
    #[error("syncfile {}: {message}", .path.display())]
    Syncfile {
        /// Path of the syncfile associated with the failure.
        path: PathBuf,
        /// Human-readable error description.
        message: String,
    },

    /// A configuration value was missing or invalid.
    #[error("config error: {0}")]
    Config(String),

    /// A git invocation failed in a way that cannot be treated as a
    /// per-method resolution miss.
    #[error("git error: {0}")]
    Git(String),

    /// A per-repository operation failed outside of revision resolution.
    #[error("repository '{name}': {message}")]
    Repo {
        /// Name of the repository associated with the failure.
        name: String,
        /// Human-readable error description.
        message: String,
    },

    /// An underlying I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl BankError {
    /// Return the recommended process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Syncfile { .. } | Self::Config(_) => 2,
            Self::Git(_) => 3,
            _ => 1,
        }
    }
}
