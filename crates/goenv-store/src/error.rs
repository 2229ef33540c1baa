//! Error types for goenv-store

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias using goenv-store's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Environment store error types
#[derive(Error, Debug)]
pub enum Error {
    /// Restore target exists and neither overwrite nor update was requested
    #[error("Environment {name:?} on '{}' exists", path.display())]
    EnvironmentExists { name: String, path: PathBuf },

    /// Backup request names no destination
    #[error("No backup target defined")]
    NoTarget,

    /// Restore request names no source
    #[error("No restore source defined")]
    NoSource,

    /// Directory does not exist
    #[error("'{}': not found", path.display())]
    NotFound { path: PathBuf },

    /// Directory exists but has no activate script
    #[error("'{}' is not a goenv environment", path.display())]
    NotAnEnvironment { path: PathBuf },

    /// Environment name cannot be used as a single directory name
    #[error("Invalid environment name: {name:?}")]
    InvalidName { name: String },

    /// Per-environment exclude file holds an invalid pattern
    #[error("Invalid exclude patterns in '{}': {source}", path.display())]
    ExcludeFile {
        path: PathBuf,
        #[source]
        source: goenv_archive::Error,
    },

    /// Home directory could not be determined
    #[error("Could not determine home directory")]
    NoHomeDir,

    /// Archive engine failure
    #[error(transparent)]
    Archive(#[from] goenv_archive::Error),

    /// Filesystem operation failed on a specific path
    #[error("'{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Create an I/O error tagged with the offending path
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create an environment exists error
    pub fn environment_exists(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::EnvironmentExists {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Returns true for refusals caused by restore policy rather than failures.
    pub fn is_policy(&self) -> bool {
        matches!(self, Self::EnvironmentExists { .. })
    }
}
