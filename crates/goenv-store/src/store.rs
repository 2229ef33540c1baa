//! The environment store directory

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{Error, Result};

/// Script every environment directory carries.
pub const ACTIVATE_FILE: &str = "activate";

/// Per-environment settings directory.
pub const SETTINGS_DIR: &str = ".goenv_settings";

/// Newline-separated exclude patterns applied to every backup.
pub const BACKUP_EXCLUDE_FILE: &str = "backup_exclude";

/// Dated backups, one subdirectory per environment.
pub const BACKUP_DIR: &str = ".backup";

/// Scratch space for staged restores.
pub const TEMP_DIR: &str = ".tmp";

/// Installed Go versions.
pub const VERSIONS_DIR: &str = ".goversions";

/// A directory of named environments.
#[derive(Debug, Clone)]
pub struct EnvStore {
    db_dir: PathBuf,
}

impl EnvStore {
    /// Opens a store. With `check` set the directory must already exist.
    pub fn open(db_dir: impl Into<PathBuf>, check: bool) -> Result<Self> {
        let db_dir = db_dir.into();
        if check && !db_dir.is_dir() {
            return Err(Error::NotFound { path: db_dir });
        }
        Ok(Self { db_dir })
    }

    pub fn from_config(config: &StoreConfig, check: bool) -> Result<Self> {
        Self::open(config.db_dir.clone(), check)
    }

    pub fn db_dir(&self) -> &Path {
        &self.db_dir
    }

    /// Path an environment named `name` lives at (it may not exist).
    pub fn env_path(&self, name: &str) -> PathBuf {
        self.db_dir.join(name)
    }

    /// Path of an existing environment.
    pub fn get_checked(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        let path = self.env_path(name);
        if !path.is_dir() {
            return Err(Error::NotFound { path });
        }
        if !is_environment(&path) {
            return Err(Error::NotAnEnvironment { path });
        }
        Ok(path)
    }

    /// Directory holding the dated backups of `name`.
    pub fn backup_dir(&self, name: &str) -> PathBuf {
        self.db_dir.join(BACKUP_DIR).join(name)
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.db_dir.join(VERSIONS_DIR)
    }

    /// Scratch directory inside the store, created on demand.
    pub fn temp_dir(&self) -> Result<PathBuf> {
        let path = self.db_dir.join(TEMP_DIR);
        if !path.is_dir() {
            debug!("Creating temp directory {}", path.display());
            fs::create_dir_all(&path).map_err(|e| Error::io(&path, e))?;
        }
        Ok(path)
    }
}

/// Returns true if `path` is a directory carrying an activate script.
pub fn is_environment(path: &Path) -> bool {
    path.join(ACTIVATE_FILE).is_file()
}

/// Rejects names that would not map to a single directory in the store.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(Error::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}
