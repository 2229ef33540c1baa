//! Environment backups

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Timelike};
use goenv_archive::{BundleWriter, PatternSet, WriteSummary, WriterConfig};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::store::{EnvStore, BACKUP_EXCLUDE_FILE, SETTINGS_DIR};

/// Extension of dated backup files.
pub const BACKUP_EXTENSION: &str = "tar.gz";

/// A backup request.
///
/// Destinations are honoured in priority order: `target`, then
/// `default_backup`, then `writer`.
#[derive(Default)]
pub struct BackupOptions<'w> {
    /// Fixed output file
    pub target: Option<PathBuf>,

    /// Write a dated file under `<store>/.backup/<name>/`
    pub default_backup: bool,

    /// Caller stream
    pub writer: Option<Box<dyn Write + 'w>>,

    /// Exclude patterns; the environment's own exclude file is merged in
    pub patterns: PatternSet,

    pub writer_config: WriterConfig,
}

impl<'w> BackupOptions<'w> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_default_backup(mut self, default_backup: bool) -> Self {
        self.default_backup = default_backup;
        self
    }

    pub fn with_writer(mut self, writer: impl Write + 'w) -> Self {
        self.writer = Some(Box::new(writer));
        self
    }

    pub fn with_patterns(mut self, patterns: PatternSet) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_writer_config(mut self, writer_config: WriterConfig) -> Self {
        self.writer_config = writer_config;
        self
    }
}

/// Result of a backup.
#[derive(Debug, Clone, Serialize)]
pub struct BackupOutcome {
    /// File written, `None` when the bundle went to a caller stream
    pub path: Option<PathBuf>,
    pub summary: WriteSummary,
}

impl EnvStore {
    /// Backs up the environment `name`.
    pub fn backup(&self, name: &str, mut options: BackupOptions<'_>) -> Result<BackupOutcome> {
        let env_path = self.get_checked(name)?;

        let exclude_file = env_path.join(SETTINGS_DIR).join(BACKUP_EXCLUDE_FILE);
        if exclude_file.is_file() {
            options
                .patterns
                .append_file(&exclude_file)
                .map_err(|source| Error::ExcludeFile {
                    path: exclude_file.clone(),
                    source,
                })?;
        }

        let writer = BundleWriter::new(options.writer_config.clone());
        let exclude = options.patterns.exclude_predicate();

        if let Some(target) = &options.target {
            let summary = write_to_file(&writer, &env_path, target, &exclude)?;
            return Ok(BackupOutcome {
                path: Some(target.clone()),
                summary,
            });
        }

        if options.default_backup {
            let dir = self.backup_dir(name);
            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
            let target = dir.join(format!(
                "{}_{}.{}",
                name,
                time_string(&Local::now()),
                BACKUP_EXTENSION
            ));
            let summary = write_to_file(&writer, &env_path, &target, &exclude)?;
            return Ok(BackupOutcome {
                path: Some(target),
                summary,
            });
        }

        if let Some(sink) = options.writer.as_mut() {
            info!("Streaming backup of '{}'", name);
            let summary = writer.compress(&env_path, sink, &exclude)?;
            return Ok(BackupOutcome {
                path: None,
                summary,
            });
        }

        Err(Error::NoTarget)
    }
}

/// Writes a bundle to `target`, removing the partial file on failure.
fn write_to_file<F>(
    writer: &BundleWriter,
    source: &Path,
    target: &Path,
    exclude: &F,
) -> Result<WriteSummary>
where
    F: Fn(&Path) -> bool,
{
    info!("Backing up {} to {}", source.display(), target.display());

    let file = File::create(target).map_err(|e| Error::io(target, e))?;
    match writer.compress(source, BufWriter::new(file), exclude) {
        Ok(summary) => Ok(summary),
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(target) {
                warn!("Failed to remove partial backup {}: {}", target.display(), cleanup);
            }
            Err(e.into())
        }
    }
}

/// Timestamp used in dated backup names: date and time followed by the
/// nanosecond part, unpadded.
pub fn time_string(time: &DateTime<Local>) -> String {
    format!("{}{}", time.format("%Y%m%d%H%M%S"), time.nanosecond())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_string() {
        let time = Local
            .with_ymd_and_hms(2024, 3, 7, 9, 5, 2)
            .unwrap()
            .with_nanosecond(1234)
            .unwrap();
        assert_eq!(time_string(&time), "202403070905021234");
    }

    #[test]
    fn test_options_builder() {
        let options = BackupOptions::new()
            .with_target("/tmp/dev.tar.gz")
            .with_default_backup(true)
            .with_writer(Vec::new());

        assert_eq!(options.target, Some(PathBuf::from("/tmp/dev.tar.gz")));
        assert!(options.default_backup);
        assert!(options.writer.is_some());
        assert!(options.patterns.is_empty());
    }
}
