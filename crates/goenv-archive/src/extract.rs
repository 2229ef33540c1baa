//! Materializing a bundle onto disk.
//!
//! Extraction is a plain sequential loop over [`BundleReader::each_root`].
//! The first failing entry aborts the run and nothing already written is
//! rolled back; callers wanting atomic restores extract into a fresh
//! directory and rename it into place.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::containment::{resolve_entry, resolve_link_target, verify_link, verify_on_disk};
use crate::entry::{BundleEntry, EntryKind, Flow};
use crate::error::{Error, Result};
use crate::progress::{EntryOutcome, VerboseLog};
use crate::reader::BundleReader;

/// Permission bits kept from entry headers.
const MODE_MASK: u32 = 0o7777;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Extraction options.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Print one status line per entry
    pub verbose: bool,

    /// Report what would be written without touching the disk
    pub dry_run: bool,

    /// Reject entries resolving outside the target directory
    pub contain_paths: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            dry_run: false,
            contain_paths: true,
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Disables containment checks and trusts entry names as-is.
    pub fn with_contain_paths(mut self, contain_paths: bool) -> Self {
        self.contain_paths = contain_paths;
        self
    }
}

/// Counters describing an extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractReport {
    /// Root name the entries were materialized under
    pub root: String,
    pub entries: u64,
    pub directories: u64,
    pub files: u64,
    /// Symlinks created (or that would be created)
    pub links: u64,
    /// Hardlinks and special files that were reported but not materialized
    pub skipped: u64,
    /// Regular file bytes written (or that would be written)
    pub bytes: u64,
    pub dry_run: bool,
}

/// Applies bundle entries to a target directory.
pub struct Extractor<'w> {
    options: ExtractOptions,
    log: VerboseLog<'w>,
}

impl<'w> Extractor<'w> {
    /// Creates an extractor; verbose lines go to standard output.
    pub fn new(options: ExtractOptions) -> Self {
        let log = if options.verbose {
            VerboseLog::stdout()
        } else {
            VerboseLog::disabled()
        };
        Self { options, log }
    }

    /// Redirects verbose lines to `out`. Ignored unless verbose is set.
    pub fn with_output(mut self, out: impl Write + 'w) -> Self {
        if self.options.verbose {
            self.log = VerboseLog::to_writer(out);
        }
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extracts every entry of `reader` under `target`, with the bundle root
    /// renamed to `new_root` (empty keeps the original root).
    pub fn extract(
        &mut self,
        reader: &mut BundleReader<'_>,
        new_root: &str,
        target: &Path,
    ) -> Result<ExtractReport> {
        let Self { options, log } = self;

        let discovered = reader.root_name()?.to_string();
        let root = match new_root.trim_matches('/') {
            "" => discovered,
            renamed => renamed.to_string(),
        };

        info!(
            "Extracting bundle root '{}' into {}{}",
            root,
            target.display(),
            if options.dry_run { " (dry run)" } else { "" }
        );

        let mut report = ExtractReport {
            root,
            dry_run: options.dry_run,
            ..Default::default()
        };

        let guard = if options.contain_paths && !options.dry_run {
            fs::create_dir_all(target).map_err(|e| Error::io(target, e))?;
            Some(fs::canonicalize(target).map_err(|e| Error::io(target, e))?)
        } else {
            None
        };
        let destination = Destination {
            target,
            root: guard.as_deref(),
        };

        reader.each_root(new_root, |entry, body| {
            log.begin(entry);
            match apply_entry(options, &destination, entry, body, &mut report) {
                Ok(()) => {
                    log.end(EntryOutcome::Done);
                    report.entries += 1;
                    Ok(Flow::Continue)
                }
                Err(e) => {
                    log.end(EntryOutcome::Failed);
                    warn!("Failed to extract '{}': {}", entry.name, e);
                    Err(e)
                }
            }
        })?;

        info!(
            "Extraction complete: {} entries ({} dirs, {} files, {} links, {} skipped)",
            report.entries, report.directories, report.files, report.links, report.skipped
        );

        Ok(report)
    }
}

/// Extracts `reader` under `target` with the given options.
pub fn extract(
    reader: &mut BundleReader<'_>,
    new_root: &str,
    target: &Path,
    options: ExtractOptions,
) -> Result<ExtractReport> {
    Extractor::new(options).extract(reader, new_root, target)
}

/// Extraction target plus its canonical form when on-disk checks apply.
struct Destination<'p> {
    target: &'p Path,
    root: Option<&'p Path>,
}

impl Destination<'_> {
    fn verify(&self, entry: &str, path: &Path, include_leaf: bool) -> Result<()> {
        match self.root {
            Some(root) => verify_on_disk(root, self.target, entry, path, include_leaf),
            None => Ok(()),
        }
    }
}

fn apply_entry(
    options: &ExtractOptions,
    destination: &Destination<'_>,
    entry: &BundleEntry,
    body: &mut dyn Read,
    report: &mut ExtractReport,
) -> Result<()> {
    let target = destination.target;
    let path = entry_path(options, target, &entry.name)?;
    let mode = entry.mode & MODE_MASK;

    match entry.kind {
        EntryKind::Directory => {
            if !options.dry_run {
                destination.verify(&entry.name, &path, true)?;
                create_dir(&path, mode)?;
            }
            report.directories += 1;
        }
        EntryKind::File => {
            let written = if options.dry_run {
                entry.size
            } else {
                destination.verify(&entry.name, &path, true)?;
                write_file(&path, mode, entry.size, body)?
            };
            report.files += 1;
            report.bytes += written;
        }
        EntryKind::Symlink => {
            let link_target = entry
                .link_target
                .as_deref()
                .ok_or_else(|| Error::invalid_entry_name(entry.name.clone()))?;
            if options.contain_paths {
                resolve_link_target(target, &entry.name, link_target)?;
            }
            if !options.dry_run {
                destination.verify(&entry.name, &path, false)?;
            }
            if !create_symlink(&path, link_target, options.dry_run)? {
                debug!("Symlinks unsupported, skipping '{}'", entry.name);
                report.skipped += 1;
                return Ok(());
            }
            if let (Some(root), false) = (destination.root, options.dry_run) {
                if let Err(e) = verify_link(root, &entry.name, &path) {
                    if let Err(cleanup) = fs::remove_file(&path) {
                        warn!("Failed to remove link {}: {}", path.display(), cleanup);
                    }
                    return Err(e);
                }
            }
            report.links += 1;
        }
        EntryKind::Hardlink | EntryKind::Other => {
            debug!("Skipping unsupported entry '{}' ({:?})", entry.name, entry.kind);
            report.skipped += 1;
        }
    }

    Ok(())
}

fn entry_path(options: &ExtractOptions, target: &Path, name: &str) -> Result<PathBuf> {
    if options.contain_paths {
        resolve_entry(target, name)
    } else {
        Ok(target.join(name))
    }
}

fn create_dir(path: &Path, mode: u32) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    builder.create(path).map_err(|e| Error::io(path, e))
}

fn write_file(path: &Path, mode: u32, size: u64, body: &mut dyn Read) -> Result<u64> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let mut open = OpenOptions::new();
    open.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        open.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = open.open(path).map_err(|e| Error::io(path, e))?;

    // Read failures come from the bundle, write failures from the target.
    let mut buf = [0u8; COPY_BUFFER_SIZE];
    let mut written = 0u64;
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::corrupted(e)),
        };
        file.write_all(&buf[..n]).map_err(|e| Error::io(path, e))?;
        written += n as u64;
    }

    if written != size {
        return Err(Error::corrupted(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("entry body ended after {} of {} bytes", written, size),
        )));
    }

    Ok(written)
}

/// Creates a symlink; returns false where the platform has no support.
#[cfg(unix)]
fn create_symlink(path: &Path, link_target: &str, dry_run: bool) -> Result<bool> {
    if dry_run {
        return Ok(true);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    if fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink()) {
        fs::remove_file(path).map_err(|e| Error::io(path, e))?;
    }

    std::os::unix::fs::symlink(link_target, path).map_err(|e| Error::io(path, e))?;
    Ok(true)
}

#[cfg(not(unix))]
fn create_symlink(_path: &Path, _link_target: &str, _dry_run: bool) -> Result<bool> {
    Ok(false)
}
