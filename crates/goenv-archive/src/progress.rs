//! Progress and verbose reporting for archive operations.
//!
//! Two channels exist:
//! - [`ArchiveProgress`]: an optional `indicatif` spinner while writing
//! - [`VerboseLog`]: the per-entry line protocol printed during extraction
//!   (`<tag> <size> <name>... done.`)

use std::io::{self, Write};

use console::{pad_str, Alignment};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};

use crate::entry::{BundleEntry, EntryKind};

/// Width of the size column in verbose lines.
const SIZE_COLUMN: usize = 12;

/// Spinner shown while a bundle is being written.
pub struct ArchiveProgress {
    bar: ProgressBar,
    entries: u64,
}

impl ArchiveProgress {
    /// Creates and starts a spinner.
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { bar, entries: 0 }
    }

    /// Records one archived entry.
    pub fn inc(&mut self, name: &str) {
        self.entries += 1;
        if self.entries % 100 == 0 {
            self.bar
                .set_message(format!("Archived {} entries ({})", self.entries, name));
        }
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Finishes the spinner with a final message.
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Outcome printed at the end of a verbose line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    Done,
    Failed,
}

impl EntryOutcome {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Done => "done.",
            Self::Failed => "failed.",
        }
    }
}

/// Writes per-entry status lines to a sink.
///
/// Write errors on the sink are ignored; the log is a side channel and
/// must not change the outcome of an extraction.
pub struct VerboseLog<'a> {
    out: Option<Box<dyn Write + 'a>>,
}

impl<'a> VerboseLog<'a> {
    /// A log that prints nothing.
    pub fn disabled() -> Self {
        Self { out: None }
    }

    /// A log printing to standard output.
    pub fn stdout() -> Self {
        Self::to_writer(io::stdout())
    }

    /// A log printing to any writer.
    pub fn to_writer(out: impl Write + 'a) -> Self {
        Self {
            out: Some(Box::new(out)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.out.is_some()
    }

    /// Prints the leading part of a line: kind tag, size column and name.
    pub fn begin(&mut self, entry: &BundleEntry) {
        if let Some(out) = self.out.as_mut() {
            let _ = write!(out, "{}... ", format_entry(entry));
            let _ = out.flush();
        }
    }

    /// Terminates the current line with the entry's outcome.
    pub fn end(&mut self, outcome: EntryOutcome) {
        if let Some(out) = self.out.as_mut() {
            let _ = writeln!(out, "{}", outcome.suffix());
        }
    }
}

/// Formats the leading part of a verbose line.
pub fn format_entry(entry: &BundleEntry) -> String {
    let size = if entry.kind == EntryKind::File {
        format!("[{}]", HumanBytes(entry.size))
    } else {
        String::new()
    };

    let name = match (&entry.link_target, entry.kind.is_link()) {
        (Some(target), true) => format!("{} -> {}", entry.name, target),
        _ => entry.name.clone(),
    };

    format!(
        "{} {}{}",
        entry.kind.tag(),
        pad_str(&size, SIZE_COLUMN, Alignment::Left, None),
        name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kind: EntryKind, size: u64, link: Option<&str>) -> BundleEntry {
        BundleEntry {
            name: name.to_string(),
            kind,
            size,
            mode: 0o644,
            mtime: 0,
            link_target: link.map(str::to_string),
        }
    }

    #[test]
    fn test_format_directory_has_blank_size_column() {
        let line = format_entry(&entry("env/src", EntryKind::Directory, 0, None));
        assert_eq!(line, format!("D {}env/src", " ".repeat(SIZE_COLUMN)));
    }

    #[test]
    fn test_format_file_has_human_size() {
        let line = format_entry(&entry("env/a.txt", EntryKind::File, 2048, None));
        assert!(line.starts_with("F [2.00 KiB]"), "got: {}", line);
        assert!(line.ends_with("env/a.txt"));
        assert_eq!(line.len(), 2 + SIZE_COLUMN + "env/a.txt".len());
    }

    #[test]
    fn test_format_link_shows_target() {
        let line = format_entry(&entry("env/current", EntryKind::Symlink, 0, Some("v1")));
        assert!(line.starts_with('L'));
        assert!(line.ends_with("env/current -> v1"));
    }

    #[test]
    fn test_verbose_log_lines() {
        let mut buf = Vec::new();
        {
            let mut log = VerboseLog::to_writer(&mut buf);
            assert!(log.is_enabled());
            log.begin(&entry("env", EntryKind::Directory, 0, None));
            log.end(EntryOutcome::Done);
            log.begin(&entry("env/x", EntryKind::File, 3, None));
            log.end(EntryOutcome::Failed);
        }
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("env... done."));
        assert!(lines[1].ends_with("env/x... failed."));
    }

    #[test]
    fn test_disabled_log_is_silent() {
        let mut log = VerboseLog::disabled();
        assert!(!log.is_enabled());
        log.begin(&entry("env", EntryKind::Directory, 0, None));
        log.end(EntryOutcome::Done);
    }

    #[test]
    fn test_archive_progress_lifecycle() {
        let mut progress = ArchiveProgress::new("Archiving...");
        progress.inc("env");
        progress.inc("env/a");
        assert_eq!(progress.entries(), 2);
        progress.finish("Archived 2 entries");
    }
}
