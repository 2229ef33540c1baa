//! goenv Archive Engine
//!
//! This crate snapshots goenv virtual environments into portable bundles and
//! reconstitutes them, possibly under a different name. A bundle is a tar
//! stream, gzip-compressed by default, rooted under a single top-level
//! directory.
//!
//! # Features
//!
//! - **Filename filters**: bare names match at any depth, globs match the full relative path
//! - **Streaming writer**: pre-order traversal straight into the caller's sink, SHA-256 computed in-stream
//! - **Root discovery and rewrite**: restore a bundle under a new top-level name
//! - **Dry-run extraction**: report every entry without touching the disk
//! - **Path containment**: entries and symlinks cannot escape the target directory
//!
//! # Examples
//!
//! ```no_run
//! use goenv_archive::{compress, extract, BundleReader, ExtractOptions, PatternSet};
//! use std::fs::File;
//! use std::path::Path;
//!
//! fn main() -> goenv_archive::Result<()> {
//!     let excludes = PatternSet::from_values([".git", "pkg/*"])?;
//!
//!     let file = File::create("myenv.tar.gz").map_err(|e| goenv_archive::Error::io("myenv.tar.gz", e))?;
//!     let summary = compress(Path::new("/home/dev/.goenv/myenv"), file, excludes.exclude_predicate())?;
//!     println!("Bundle written: {} entries", summary.entries);
//!
//!     let mut reader = BundleReader::open(Path::new("myenv.tar.gz"), false)?;
//!     let report = extract(&mut reader, "copy", Path::new("/tmp/envs"), ExtractOptions::new())?;
//!     println!("Restored {} files under {}", report.files, report.root);
//!     Ok(())
//! }
//! ```

pub mod compression;
pub mod containment;
pub mod entry;
pub mod error;
pub mod extract;
pub mod patterns;
pub mod progress;
pub mod reader;
pub mod writer;

// Re-export commonly used types
pub use compression::{calculate_checksum, Compression, DEFAULT_COMPRESSION_LEVEL};
pub use entry::{BundleEntry, EntryKind, Flow};
pub use error::{Error, Result};
pub use extract::{extract, ExtractOptions, ExtractReport, Extractor};
pub use patterns::{Pattern, PatternSet};
pub use progress::{ArchiveProgress, EntryOutcome, VerboseLog};
pub use reader::BundleReader;
pub use writer::{compress, BundleWriter, WriteSummary, WriterConfig};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
