//! Error types for goenv-archive

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias using goenv-archive's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Archive engine error types
#[derive(Error, Debug)]
pub enum Error {
    /// A filter value failed to compile
    #[error("Invalid pattern {index}: {value:?}: {source}")]
    Pattern {
        index: usize,
        value: String,
        #[source]
        source: globset::Error,
    },

    /// Directory traversal failed
    #[error("Failed to walk '{}': {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Filesystem operation failed on a specific path
    #[error("'{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// First entry of the bundle is not a single-segment directory
    #[error("Invalid root name: {name:?}")]
    InvalidRoot { name: String },

    /// The bundle has no entries at all
    #[error("Archive is empty, no root entry found")]
    EmptyArchive,

    /// An entry is not nested under the bundle root
    #[error("Entry {entry:?} is outside of root {root:?}")]
    EntryOutsideRoot { entry: String, root: String },

    /// Entry name cannot be used as a relative path
    #[error("Invalid entry name: {name:?}")]
    InvalidEntryName { name: String },

    /// Entry would be written outside the extraction target
    #[error("Entry {entry:?} escapes target directory: '{}'", resolved.display())]
    PathEscape { entry: String, resolved: PathBuf },

    /// Container or compression stream is malformed or truncated
    #[error("Archive is corrupted: {source}")]
    Corrupted {
        #[source]
        source: io::Error,
    },

    /// The stream was already read to the end by a previous pass
    #[error("Archive stream has already been consumed")]
    StreamConsumed,

    /// Writing the trailer or flushing the caller's sink failed
    #[error("Failed to finalize archive: {source}")]
    Finalize {
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

    /// Create an invalid root error
    pub fn invalid_root(name: impl Into<String>) -> Self {
        Self::InvalidRoot { name: name.into() }
    }

    /// Create an invalid entry name error
    pub fn invalid_entry_name(name: impl Into<String>) -> Self {
        Self::InvalidEntryName { name: name.into() }
    }

    /// Create an entry outside root error
    pub fn entry_outside_root(entry: impl Into<String>, root: impl Into<String>) -> Self {
        Self::EntryOutsideRoot {
            entry: entry.into(),
            root: root.into(),
        }
    }

    /// Create a path escape error
    pub fn path_escape(entry: impl Into<String>, resolved: impl Into<PathBuf>) -> Self {
        Self::PathEscape {
            entry: entry.into(),
            resolved: resolved.into(),
        }
    }

    /// Create a corrupted archive error
    pub fn corrupted(source: io::Error) -> Self {
        Self::Corrupted { source }
    }

    /// Returns true for malformed-bundle errors (as opposed to filesystem or filter errors).
    pub fn is_malformed_archive(&self) -> bool {
        matches!(
            self,
            Self::InvalidRoot { .. }
                | Self::EmptyArchive
                | Self::EntryOutsideRoot { .. }
                | Self::InvalidEntryName { .. }
                | Self::Corrupted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_root_message() {
        let err = Error::invalid_root("a/b");
        assert_eq!(err.to_string(), "Invalid root name: \"a/b\"");
        assert!(err.is_malformed_archive());
    }

    #[test]
    fn test_io_error_carries_path() {
        let err = Error::io(
            "/tmp/missing",
            io::Error::new(io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("/tmp/missing"));
        assert!(!err.is_malformed_archive());
    }

    #[test]
    fn test_pattern_error_reports_index_and_value() {
        let source = globset::Glob::new("[bad").unwrap_err();
        let err = Error::Pattern {
            index: 2,
            value: "[bad".to_string(),
            source,
        };
        let msg = err.to_string();
        assert!(msg.contains("2"), "got: {}", msg);
        assert!(msg.contains("[bad"), "got: {}", msg);
    }
}
