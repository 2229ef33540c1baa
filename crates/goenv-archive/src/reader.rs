//! Sequential bundle reader with root discovery and root-name rewriting.
//!
//! A bundle is read exactly once. The first entry is the bundle root; once
//! discovered it is cached on the reader and replayed ahead of the remaining
//! entries, so `root_name` followed by `each_root` never re-reads the stream.
//! A pass stopped early keeps its position: the next pass resumes after the
//! entry it stopped on.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use tar::Archive;
use tracing::debug;

use crate::compression::Compression;
use crate::entry::{BundleEntry, Flow, SEPARATOR};
use crate::error::{Error, Result};

/// Tar record size; entry bodies are padded to a multiple of it.
const BLOCK_SIZE: u64 = 512;

/// Reads entries from a (possibly compressed) bundle stream.
pub struct BundleReader<'a> {
    archive: Option<Archive<Box<dyn Read + 'a>>>,
    root: Option<BundleEntry>,
    /// The cached root still precedes the stream position
    replay_root: bool,
}

impl<'a> BundleReader<'a> {
    /// Wraps a byte source. When `archive_only` is set the source is read as
    /// a raw tar stream, otherwise it is gunzipped first.
    pub fn new<R: Read + 'a>(source: R, archive_only: bool) -> Self {
        Self::with_compression(source, Compression::for_archive_only(archive_only))
    }

    /// Wraps a byte source with an explicit envelope.
    pub fn with_compression<R: Read + 'a>(source: R, compression: Compression) -> Self {
        Self {
            archive: Some(Archive::new(compression.decoder(source))),
            root: None,
            replay_root: false,
        }
    }

    /// Visits every entry in stream order.
    ///
    /// The callback may read the entry body; whatever it leaves unread is
    /// skipped before the next entry. Returning [`Flow::Stop`] ends the
    /// iteration successfully and a later call resumes with the next entry.
    /// Once a pass reaches the end of the stream, further passes fail with
    /// [`Error::StreamConsumed`].
    pub fn each<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(&BundleEntry, &mut dyn Read) -> Result<Flow>,
    {
        self.walk(|entry, body| callback(entry, body))
    }

    /// Returns the bundle root name, trimmed of separators.
    ///
    /// Reads at most the first entry. Fails with [`Error::InvalidRoot`] unless
    /// that entry is a directory with exactly one path segment.
    pub fn root_name(&mut self) -> Result<&str> {
        let root = match self.root.take() {
            Some(root) => root,
            None => {
                let first = self.read_first()?;
                self.replay_root = true;
                first
            }
        };
        let root = self.root.insert(root);
        validate_root(root)?;
        Ok(root.trimmed_name())
    }

    /// Like [`BundleReader::each`], with the root segment of every entry name
    /// replaced by `new_root`.
    ///
    /// An empty `new_root`, or one equal to the discovered root, leaves names
    /// untouched. Entries not nested under the root fail with
    /// [`Error::EntryOutsideRoot`].
    pub fn each_root<F>(&mut self, new_root: &str, mut callback: F) -> Result<()>
    where
        F: FnMut(&BundleEntry, &mut dyn Read) -> Result<Flow>,
    {
        let root = self.root_name()?.to_string();
        let new_root = new_root.trim_matches(SEPARATOR);
        let rename = !new_root.is_empty() && new_root != root;

        if rename {
            debug!("Rewriting bundle root '{}' -> '{}'", root, new_root);
        }

        self.walk(|entry, body| {
            let rest = strip_root(&entry.name, &root)?;
            if rename {
                entry.name = format!("{}{}", new_root, rest);
            }
            callback(entry, body)
        })
    }

    /// Collects every entry header without touching the disk.
    pub fn entries_list(&mut self) -> Result<Vec<BundleEntry>> {
        let mut entries = Vec::new();
        self.each(|entry, _| {
            entries.push(entry.clone());
            Ok(Flow::Continue)
        })?;
        Ok(entries)
    }

    fn walk<F>(&mut self, mut visit: F) -> Result<()>
    where
        F: FnMut(&mut BundleEntry, &mut dyn Read) -> Result<Flow>,
    {
        let mut archive = self.archive.take().ok_or(Error::StreamConsumed)?;

        if let (true, Some(root)) = (self.replay_root, &self.root) {
            let mut root = root.clone();
            if visit(&mut root, &mut io::empty())? == Flow::Stop {
                self.archive = Some(archive);
                return Ok(());
            }
        }
        self.replay_root = false;

        let mut stopped = None;
        for entry in archive.entries().map_err(Error::corrupted)? {
            let mut entry = entry.map_err(Error::corrupted)?;
            let mut header = BundleEntry::from_tar(&entry)?;
            if visit(&mut header, &mut entry)? == Flow::Stop {
                io::copy(&mut entry, &mut io::sink()).map_err(Error::corrupted)?;
                stopped = Some(entry.size());
                break;
            }
        }

        if let Some(body_size) = stopped {
            self.archive = Some(rewrap(archive, body_size)?);
        }
        Ok(())
    }

    /// Reads the first entry and re-wraps the underlying stream so the next
    /// pass starts at the second entry.
    fn read_first(&mut self) -> Result<BundleEntry> {
        let mut archive = self.archive.take().ok_or(Error::StreamConsumed)?;

        let (first, body_size) = {
            let mut entries = archive.entries().map_err(Error::corrupted)?;
            let mut entry = match entries.next() {
                Some(entry) => entry.map_err(Error::corrupted)?,
                None => return Err(Error::EmptyArchive),
            };
            let first = BundleEntry::from_tar(&entry)?;
            let drained = io::copy(&mut entry, &mut io::sink()).map_err(Error::corrupted)?;
            (first, drained)
        };

        self.archive = Some(rewrap(archive, body_size)?);

        debug!("Discovered bundle root entry '{}'", first.name);
        Ok(first)
    }
}

impl BundleReader<'static> {
    /// Opens a bundle file from disk.
    pub fn open(path: &Path, archive_only: bool) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::new(BufReader::new(file), archive_only))
    }
}

/// Skips the padding after a fully read entry body and starts a fresh
/// archive at the next header.
fn rewrap<'a>(
    archive: Archive<Box<dyn Read + 'a>>,
    body_size: u64,
) -> Result<Archive<Box<dyn Read + 'a>>> {
    let mut inner = archive.into_inner();
    let padding = (BLOCK_SIZE - body_size % BLOCK_SIZE) % BLOCK_SIZE;
    if padding > 0 {
        io::copy(&mut (&mut inner).take(padding), &mut io::sink()).map_err(Error::corrupted)?;
    }
    Ok(Archive::new(inner))
}

fn validate_root(entry: &BundleEntry) -> Result<()> {
    let name = entry.trimmed_name();
    if !entry.is_dir()
        || name.is_empty()
        || name.contains(SEPARATOR)
        || name == "."
        || name == ".."
    {
        return Err(Error::invalid_root(entry.name.clone()));
    }
    Ok(())
}

/// Returns the part of `name` after the root segment ("" or "/...").
fn strip_root<'n>(name: &'n str, root: &str) -> Result<&'n str> {
    match name.trim_start_matches(SEPARATOR).strip_prefix(root) {
        Some(rest) if rest.is_empty() || rest.starts_with(SEPARATOR) => Ok(rest),
        _ => Err(Error::entry_outside_root(name, root)),
    }
}
