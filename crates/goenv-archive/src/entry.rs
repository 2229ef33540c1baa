//! Entry headers as seen by callers of the reader.

use std::io::Read;

use serde::Serialize;

use crate::error::{Error, Result};

/// Separator used for entry names inside the container stream.
pub const SEPARATOR: char = '/';

/// Kind of filesystem node an entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Hardlink,
    Other,
}

impl EntryKind {
    fn from_tar(entry_type: tar::EntryType) -> Self {
        if entry_type.is_dir() {
            Self::Directory
        } else if entry_type.is_symlink() {
            Self::Symlink
        } else if entry_type.is_hard_link() {
            Self::Hardlink
        } else if entry_type.is_file() || entry_type.is_contiguous() {
            Self::File
        } else {
            Self::Other
        }
    }

    /// Single-letter tag used in verbose listings.
    pub fn tag(&self) -> char {
        match self {
            Self::File => 'F',
            Self::Directory => 'D',
            Self::Symlink => 'L',
            Self::Hardlink => 'H',
            Self::Other => '?',
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Self::Symlink | Self::Hardlink)
    }
}

/// One header of the container stream, detached from its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleEntry {
    /// Relative, forward-slash separated name (possibly rewritten)
    pub name: String,
    pub kind: EntryKind,
    /// Body size in bytes
    pub size: u64,
    /// Permission bits
    pub mode: u32,
    /// Modification time, seconds since the epoch
    pub mtime: u64,
    /// Target for symlink and hardlink entries
    pub link_target: Option<String>,
}

impl BundleEntry {
    pub(crate) fn from_tar<R: Read>(entry: &tar::Entry<'_, R>) -> Result<Self> {
        let name = String::from_utf8(entry.path_bytes().into_owned()).map_err(|e| {
            Error::invalid_entry_name(String::from_utf8_lossy(e.as_bytes()).into_owned())
        })?;

        let header = entry.header();
        let kind = EntryKind::from_tar(header.entry_type());

        let link_target = match entry.link_name_bytes() {
            Some(bytes) if kind.is_link() => {
                Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            _ => None,
        };

        Ok(Self {
            kind,
            size: entry.size(),
            mode: header.mode().map_err(Error::corrupted)?,
            mtime: header.mtime().unwrap_or(0),
            link_target,
            name,
        })
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Name with leading/trailing separators removed.
    pub fn trimmed_name(&self) -> &str {
        self.name.trim_matches(SEPARATOR)
    }
}

/// Decision returned by iteration callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading entries
    Continue,
    /// Stop after this entry; not an error
    Stop,
}
