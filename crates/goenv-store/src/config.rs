//! Store location and path helpers

use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Environment variable overriding the store location.
pub const GOENV_ROOT_ENV: &str = "GOENV_ROOT";

/// Store directory name under the home directory.
pub const DEFAULT_DB_DIR: &str = ".goenv";

/// Resolved store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding environments, backups and installed versions
    pub db_dir: PathBuf,
}

impl StoreConfig {
    pub fn new(db_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_dir: db_dir.into(),
        }
    }

    /// Resolves the store from `GOENV_ROOT`, falling back to `~/.goenv`.
    pub fn from_env() -> Result<Self> {
        match env::var(GOENV_ROOT_ENV) {
            Ok(root) if !root.is_empty() => Ok(Self::new(expand_tilde(&root)?)),
            _ => Ok(Self::new(get_home_dir()?.join(DEFAULT_DB_DIR))),
        }
    }
}

/// Get the user's home directory
///
/// HOME wins over `dirs::home_dir()` so that overrides in containers and
/// tests are honoured.
pub fn get_home_dir() -> Result<PathBuf> {
    if let Ok(home) = env::var("HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }

    dirs::home_dir().ok_or(Error::NoHomeDir)
}

/// Expands a leading `~` or `~/` to the home directory.
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if path == "~" {
        return get_home_dir();
    }
    match path.strip_prefix("~/") {
        Some(rest) => Ok(get_home_dir()?.join(rest)),
        None => Ok(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let previous = env::var(key).ok();
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.previous {
                Some(value) => env::set_var(self.key, value),
                None => env::remove_var(self.key),
            }
        }
    }

    #[test]
    #[serial]
    fn test_from_env_uses_goenv_root() {
        let _root = EnvGuard::set(GOENV_ROOT_ENV, Some("/srv/goenv"));
        assert_eq!(StoreConfig::from_env().unwrap().db_dir, PathBuf::from("/srv/goenv"));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults_to_home() {
        let _root = EnvGuard::set(GOENV_ROOT_ENV, None);
        let _home = EnvGuard::set("HOME", Some("/home/tester"));
        assert_eq!(
            StoreConfig::from_env().unwrap().db_dir,
            PathBuf::from("/home/tester/.goenv")
        );
    }

    #[test]
    #[serial]
    fn test_expand_tilde() {
        let _home = EnvGuard::set("HOME", Some("/home/tester"));
        assert_eq!(expand_tilde("~").unwrap(), PathBuf::from("/home/tester"));
        assert_eq!(
            expand_tilde("~/backups/dev.tar.gz").unwrap(),
            PathBuf::from("/home/tester/backups/dev.tar.gz")
        );
        assert_eq!(
            expand_tilde("/tmp/~/x").unwrap(),
            PathBuf::from("/tmp/~/x")
        );
        assert_eq!(expand_tilde("~other").unwrap(), PathBuf::from("~other"));
    }
}
