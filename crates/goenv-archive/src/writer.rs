//! Bundle creation.
//!
//! Walks a source tree in deterministic pre-order and streams it into a tar
//! container wrapped in the configured compression envelope. Nothing is
//! staged on disk; the caller's sink receives the bytes as they are produced.

use std::fs::{self, File, Metadata};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tar::Builder as TarBuilder;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::compression::{ChecksumWriter, Compression};
use crate::error::{Error, Result};
use crate::progress::ArchiveProgress;

/// Configuration for bundle creation.
#[derive(Debug, Clone, Default)]
pub struct WriterConfig {
    /// Envelope around the tar stream
    pub compression: Compression,

    /// Whether to show a progress spinner
    pub show_progress: bool,
}

impl WriterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression envelope.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the gzip level (clamped to 1-9).
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression = Compression::gzip(level);
        self
    }

    /// Sets whether to show progress.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

/// Counters describing a written bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    /// Entries written to the container, root included
    pub entries: u64,
    pub files: u64,
    pub directories: u64,
    pub symlinks: u64,
    /// Nodes skipped by the exclude predicate (descendants of an excluded
    /// directory are not visited and not counted)
    pub excluded: u64,
    /// Sum of regular file sizes
    pub content_bytes: u64,
    /// Bytes handed to the sink after compression
    pub archive_bytes: u64,
    /// SHA-256 hex digest of the bytes handed to the sink
    pub checksum: String,
}

/// Writes bundles according to a [`WriterConfig`].
pub struct BundleWriter {
    config: WriterConfig,
}

impl BundleWriter {
    pub fn new(config: WriterConfig) -> Self {
        Self { config }
    }

    /// Archives `source` into `sink`, skipping nodes for which `exclude`
    /// returns true.
    ///
    /// The predicate sees paths relative to `source`. A directory source is
    /// rooted in the bundle under its own base name; a single file is stored
    /// under its file name. A symlinked source is classified by what it
    /// points to; links below it are stored as links. On error the sink may
    /// hold a partial stream.
    pub fn compress<W, F>(&self, source: &Path, sink: W, exclude: F) -> Result<WriteSummary>
    where
        W: Write,
        F: Fn(&Path) -> bool,
    {
        let metadata = fs::metadata(source).map_err(|e| Error::io(source, e))?;
        let base = base_name(source)?;
        let prefix = metadata.is_dir().then(|| base.clone());

        info!("Creating bundle from {}", source.display());

        let encoder = self.config.compression.encoder(ChecksumWriter::new(sink));
        let mut tar = TarBuilder::new(encoder);
        tar.follow_symlinks(false);

        let mut progress = self
            .config
            .show_progress
            .then(|| ArchiveProgress::new("Archiving..."));

        let mut summary = WriteSummary::default();
        let mut walker = WalkDir::new(source)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|e| Error::Walk {
                path: e.path().unwrap_or(source).to_path_buf(),
                source: e,
            })?;

            let rel_path = entry.path().strip_prefix(source).unwrap_or(entry.path());

            if entry.depth() > 0 && exclude(rel_path) {
                debug!("Excluded: {}", rel_path.display());
                summary.excluded += 1;
                if entry.file_type().is_dir() {
                    walker.skip_current_dir();
                }
                continue;
            }

            let name = entry_name(&base, prefix.as_deref(), rel_path);
            if entry.depth() == 0 {
                append_root(&mut tar, entry.path(), &name, &metadata)?;
            } else {
                tar.append_path_with_name(entry.path(), &name)
                    .map_err(|e| Error::io(entry.path(), e))?;
            }

            let file_type = if entry.depth() == 0 {
                metadata.file_type()
            } else {
                entry.file_type()
            };
            if file_type.is_dir() {
                summary.directories += 1;
            } else if file_type.is_symlink() {
                summary.symlinks += 1;
            } else if file_type.is_file() {
                summary.files += 1;
                summary.content_bytes += if entry.depth() == 0 {
                    metadata.len()
                } else {
                    entry
                        .metadata()
                        .map_err(|e| Error::Walk {
                            path: entry.path().to_path_buf(),
                            source: e,
                        })?
                        .len()
                };
            }
            summary.entries += 1;

            if let Some(progress) = progress.as_mut() {
                progress.inc(&name.to_string_lossy());
            }
        }

        let encoder = tar
            .into_inner()
            .map_err(|source| Error::Finalize { source })?;
        let checksum_writer = encoder
            .finish()
            .map_err(|source| Error::Finalize { source })?;
        let (_, archive_bytes, checksum) = checksum_writer
            .finish()
            .map_err(|source| Error::Finalize { source })?;

        summary.archive_bytes = archive_bytes;
        summary.checksum = checksum;

        if let Some(progress) = progress {
            progress.finish(&format!("Archived {} entries", summary.entries));
        }

        info!(
            "Bundle written: {} entries, {} excluded, {} bytes",
            summary.entries, summary.excluded, summary.archive_bytes
        );

        Ok(summary)
    }
}

/// Archives `source` into `sink` with the default gzip envelope.
pub fn compress<W, F>(source: &Path, sink: W, exclude: F) -> Result<WriteSummary>
where
    W: Write,
    F: Fn(&Path) -> bool,
{
    BundleWriter::new(WriterConfig::default()).compress(source, sink, exclude)
}

/// Appends the source node itself, following it if it is a symlink.
fn append_root<W: Write>(
    tar: &mut TarBuilder<W>,
    path: &Path,
    name: &Path,
    metadata: &Metadata,
) -> Result<()> {
    let appended = if metadata.is_dir() {
        tar.append_dir(name, path)
    } else if metadata.is_file() {
        let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
        tar.append_file(name, &mut file)
    } else {
        tar.append_path_with_name(path, name)
    };
    appended.map_err(|e| Error::io(path, e))
}

fn base_name(source: &Path) -> Result<PathBuf> {
    if let Some(name) = source.file_name() {
        return Ok(PathBuf::from(name));
    }

    // "." and ".." have no file name of their own
    let canonical = fs::canonicalize(source).map_err(|e| Error::io(source, e))?;
    canonical
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| Error::invalid_entry_name(source.display().to_string()))
}

/// Name of a node inside the container.
fn entry_name(base: &Path, prefix: Option<&Path>, rel_path: &Path) -> PathBuf {
    match prefix {
        Some(prefix) if rel_path.as_os_str().is_empty() => prefix.to_path_buf(),
        Some(prefix) => prefix.join(rel_path),
        None => base.to_path_buf(),
    }
}
