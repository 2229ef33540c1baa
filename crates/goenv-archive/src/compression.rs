//! Compression envelope for bundles.
//!
//! Bundles are tar streams optionally wrapped in gzip. The writer side
//! also hashes the final bytes in-stream so callers get a SHA-256 of what
//! reached their sink without re-reading it.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Default compression level (6 = balanced speed/ratio).
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Envelope applied around the tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    /// Raw tar stream
    None,
    /// Gzip with a level in 1..=9
    Gzip { level: u32 },
}

impl Compression {
    /// Gzip with the level clamped into 1..=9.
    pub fn gzip(level: u32) -> Self {
        Self::Gzip {
            level: level.clamp(1, 9),
        }
    }

    /// Selects the envelope matching the reader's "already an archive" flag.
    pub fn for_archive_only(archive_only: bool) -> Self {
        if archive_only {
            Self::None
        } else {
            Self::default()
        }
    }

    pub fn is_compressed(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Wraps a sink in the matching encoder.
    pub fn encoder<W: Write>(self, sink: W) -> Encoder<W> {
        match self {
            Self::None => Encoder::Raw(sink),
            Self::Gzip { level } => {
                Encoder::Gzip(GzEncoder::new(sink, flate2::Compression::new(level)))
            }
        }
    }

    /// Wraps a source in the matching decoder.
    pub fn decoder<'a, R: Read + 'a>(self, source: R) -> Box<dyn Read + 'a> {
        match self {
            Self::None => Box::new(source),
            Self::Gzip { .. } => Box::new(MultiGzDecoder::new(source)),
        }
    }
}

impl Default for Compression {
    fn default() -> Self {
        Self::Gzip {
            level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

/// Streaming encoder selected by [`Compression`].
pub enum Encoder<W: Write> {
    Raw(W),
    Gzip(GzEncoder<W>),
}

impl<W: Write> Encoder<W> {
    /// Writes the envelope trailer and returns the wrapped sink.
    pub fn finish(self) -> io::Result<W> {
        match self {
            Self::Raw(mut sink) => {
                sink.flush()?;
                Ok(sink)
            }
            Self::Gzip(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Raw(sink) => sink.write(buf),
            Self::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Raw(sink) => sink.flush(),
            Self::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// Writer that calculates SHA256 checksum while writing.
pub struct ChecksumWriter<W: Write> {
    writer: W,
    hasher: Sha256,
    bytes_written: u64,
}

impl<W: Write> ChecksumWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            hasher: Sha256::new(),
            bytes_written: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn checksum(&self) -> String {
        format!("{:x}", self.hasher.clone().finalize())
    }

    /// Flushes and returns the sink, byte count and hex digest.
    pub fn finish(mut self) -> io::Result<(W, u64, String)> {
        self.writer.flush()?;
        let checksum = self.checksum();
        Ok((self.writer, self.bytes_written, checksum))
    }
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Calculates SHA256 checksum of a file.
pub fn calculate_checksum(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;

    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| Error::io(path, e))?;

    Ok(format!("{:x}", hasher.finalize()))
}
