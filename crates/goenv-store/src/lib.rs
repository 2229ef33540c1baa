//! goenv Environment Store
//!
//! Backup, restore and version installation for a directory of goenv
//! environments, built on the `goenv-archive` engine.
//!
//! # Layout
//!
//! ```text
//! $GOENV_ROOT/
//!   <env>/activate                        environment marker
//!   <env>/.goenv_settings/backup_exclude  patterns merged into every backup
//!   .backup/<env>/<env>_<stamp>.tar.gz    dated backups
//!   .goversions/<version>/                installed Go versions
//!   .tmp/                                 staged restores
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use goenv_store::{BackupOptions, EnvStore, RestoreOptions, StoreConfig};
//!
//! fn main() -> goenv_store::Result<()> {
//!     let store = EnvStore::from_config(&StoreConfig::from_env()?, true)?;
//!
//!     let outcome = store.backup("dev", BackupOptions::new().with_default_backup(true))?;
//!     if let Some(path) = outcome.path {
//!         let restored = store.restore(
//!             RestoreOptions::new()
//!                 .with_source(path.to_string_lossy())
//!                 .with_name("dev-copy"),
//!         )?;
//!         println!("Restore saved on {}", restored.path.display());
//!     }
//!     Ok(())
//! }
//! ```

pub mod backup;
pub mod config;
pub mod error;
pub mod restore;
pub mod store;

// Re-export commonly used types
pub use backup::{BackupOptions, BackupOutcome};
pub use config::{expand_tilde, get_home_dir, StoreConfig, GOENV_ROOT_ENV};
pub use error::{Error, Result};
pub use restore::{RestoreOptions, RestoreOutcome};
pub use store::EnvStore;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
