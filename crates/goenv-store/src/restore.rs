//! Environment restores and version installs

use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;

use goenv_archive::{BundleReader, ExtractOptions, ExtractReport, Extractor};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::expand_tilde;
use crate::error::{Error, Result};
use crate::store::{validate_name, EnvStore};

/// Prefix of staging directories under the store's temp dir.
const STAGING_PREFIX: &str = "restore-";

/// A restore request.
#[derive(Default)]
pub struct RestoreOptions<'r> {
    /// Bundle path; a leading `~` is expanded
    pub source: Option<String>,

    /// Bundle stream, used when `source` is not set
    pub reader: Option<Box<dyn Read + 'r>>,

    /// Environment name override; the bundle root name otherwise
    pub name: Option<String>,

    /// Replace an existing environment
    pub overwrite: bool,

    /// Extract over an existing environment
    pub update: bool,

    /// The bundle is a raw tar stream, not gzip
    pub archive: bool,

    pub verbose: bool,

    pub dry_run: bool,

    /// Sink for verbose lines (standard output when unset)
    pub output: Option<Box<dyn Write + 'r>>,
}

impl<'r> RestoreOptions<'r> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_reader(mut self, reader: impl Read + 'r) -> Self {
        self.reader = Some(Box::new(reader));
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }

    pub fn with_archive(mut self, archive: bool) -> Self {
        self.archive = archive;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_output(mut self, output: impl Write + 'r) -> Self {
        self.output = Some(Box::new(output));
        self
    }
}

/// Result of a restore.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreOutcome {
    /// Environment directory restored into
    pub path: PathBuf,
    pub report: ExtractReport,
}

impl EnvStore {
    /// Restores an environment from a bundle.
    ///
    /// A fresh restore is extracted into a staging directory and renamed
    /// into place only once every entry succeeded. Updates and dry runs
    /// work directly against the store.
    pub fn restore(&self, options: RestoreOptions<'_>) -> Result<RestoreOutcome> {
        let RestoreOptions {
            source,
            reader,
            name,
            overwrite,
            update,
            archive,
            verbose,
            dry_run,
            output,
        } = options;

        let input: Box<dyn Read + '_> = match (source, reader) {
            (Some(source), _) => {
                let path = expand_tilde(&source)?;
                let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
                Box::new(BufReader::new(file))
            }
            (None, Some(reader)) => reader,
            (None, None) => return Err(Error::NoSource),
        };

        let mut bundle = BundleReader::new(input, archive);
        let root = bundle.root_name()?.to_string();
        let name = name.filter(|n| !n.is_empty()).unwrap_or(root);
        validate_name(&name)?;

        let path = self.env_path(&name);
        let mut exists = path.is_dir();

        if exists && !overwrite && !update {
            return Err(Error::environment_exists(name, path));
        }

        if exists && overwrite && !dry_run {
            info!("Removing existing environment {}", path.display());
            fs::remove_dir_all(&path).map_err(|e| Error::io(&path, e))?;
            exists = false;
        }

        let mut extractor = Extractor::new(
            ExtractOptions::new()
                .with_verbose(verbose)
                .with_dry_run(dry_run),
        );
        if let Some(output) = output {
            extractor = extractor.with_output(output);
        }

        let report = if exists || dry_run {
            extractor.extract(&mut bundle, &name, self.db_dir())?
        } else {
            let staging = tempfile::Builder::new()
                .prefix(STAGING_PREFIX)
                .tempdir_in(self.temp_dir()?)
                .map_err(|e| Error::io(self.db_dir(), e))?;
            debug!("Staging restore in {}", staging.path().display());

            let report = extractor.extract(&mut bundle, &name, staging.path())?;
            let staged = staging.path().join(&name);
            fs::rename(&staged, &path).map_err(|e| Error::io(&path, e))?;
            report
        };

        info!("Restored '{}' into {}", name, path.display());
        Ok(RestoreOutcome { path, report })
    }

    /// Installs a downloaded Go version bundle under `<store>/.goversions`.
    ///
    /// The bundle root is renamed to `version`; a previous install of the
    /// same version is replaced.
    pub fn install_version(&self, bundle: impl Read, version: &str) -> Result<PathBuf> {
        validate_name(version)?;

        let versions = self.versions_dir();
        fs::create_dir_all(&versions).map_err(|e| Error::io(&versions, e))?;

        let mut reader = BundleReader::new(bundle, false);
        let root = reader.root_name()?.to_string();
        debug!("Installing bundle root '{}' as version {}", root, version);

        let dest = versions.join(version);
        if dest.exists() {
            fs::remove_dir_all(&dest).map_err(|e| Error::io(&dest, e))?;
        }

        Extractor::new(ExtractOptions::new()).extract(&mut reader, version, &versions)?;

        info!("Installed Go {} into {}", version, dest.display());
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn store() -> (EnvStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = EnvStore::open(temp_dir.path(), true).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_restore_without_source() {
        let (store, _temp) = store();
        let err = store.restore(RestoreOptions::new()).unwrap_err();
        assert!(matches!(err, Error::NoSource));
    }

    #[test]
    fn test_restore_missing_file() {
        let (store, _temp) = store();
        let err = store
            .restore(RestoreOptions::new().with_source("/nonexistent/dev.tar.gz"))
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_restore_rejects_garbage() {
        let (store, temp) = store();
        let err = store
            .restore(RestoreOptions::new().with_reader(Cursor::new(b"garbage".to_vec())))
            .unwrap_err();
        match err {
            Error::Archive(e) => assert!(e.is_malformed_archive()),
            other => panic!("Expected archive error, got {:?}", other),
        }
        assert!(!temp.path().join(".tmp").exists());
    }

    #[test]
    fn test_options_builder() {
        let options = RestoreOptions::new()
            .with_source("~/dev.tar.gz")
            .with_name("copy")
            .with_update(true)
            .with_archive(true);

        assert_eq!(options.source.as_deref(), Some("~/dev.tar.gz"));
        assert_eq!(options.name.as_deref(), Some("copy"));
        assert!(options.update);
        assert!(options.archive);
        assert!(!options.overwrite);
        assert!(!options.dry_run);
    }
}
