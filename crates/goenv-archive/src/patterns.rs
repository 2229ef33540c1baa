//! Filename filters for backup and restore operations.
//!
//! A [`PatternSet`] compiles user-supplied strings into glob matchers:
//! - Bare names (no glob metacharacters) match that name at any depth,
//!   as if written `**/<name>`
//! - Anything else is a glob matched against the full relative path
//!
//! The set exposes two predicates with deliberately different defaults:
//! an empty set includes everything and excludes nothing.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use globset::{Glob, GlobMatcher};
use tracing::debug;

use crate::error::{Error, Result};

/// Characters that turn a filter value into a glob expression.
const GLOB_SPECIAL: &[char] = &['*', '?', '[', ']', '{', '}', '\\'];

/// Returns true if the value contains any glob metacharacter.
pub fn has_glob_special(value: &str) -> bool {
    value.contains(GLOB_SPECIAL)
}

/// A single compiled filter value.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    matcher: GlobMatcher,
}

impl Pattern {
    /// Compiles a raw filter value.
    pub fn compile(raw: &str) -> std::result::Result<Self, globset::Error> {
        let glob = if has_glob_special(raw) {
            Glob::new(raw)?
        } else {
            Glob::new(&format!("**/{}", raw))?
        };

        Ok(Self {
            raw: raw.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    /// The value as supplied by the user.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_match(&self, path: &Path) -> bool {
        self.matcher.is_match(path)
    }
}

/// Insertion-ordered, deduplicated collection of compiled filters.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
    seen: HashSet<String>,
}

impl PatternSet {
    /// Creates an empty pattern set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a pattern set from a list of raw values.
    pub fn from_values<I, S>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        set.append(values)?;
        Ok(set)
    }

    /// Compiles and adds each non-empty value not already in the set.
    ///
    /// Stops at the first value that fails to compile. Values before it stay
    /// in the set; the error carries the failing value's index and text.
    pub fn append<I, S>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (index, value) in values.into_iter().enumerate() {
            let value = value.as_ref();
            if value.is_empty() || self.seen.contains(value) {
                continue;
            }

            let pattern = Pattern::compile(value).map_err(|source| Error::Pattern {
                index,
                value: value.to_string(),
                source,
            })?;

            debug!("Added filter pattern: {}", value);
            self.seen.insert(value.to_string());
            self.patterns.push(pattern);
        }
        Ok(())
    }

    /// Appends patterns from a newline-separated settings file.
    ///
    /// Lines are trimmed; blank lines are ignored.
    pub fn append_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        self.append(parse_pattern_lines(&content))
    }

    /// Number of compiled patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Compiled patterns in insertion order.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Returns true if any pattern matches the path.
    pub fn matches(&self, path: &Path) -> bool {
        self.patterns.iter().any(|p| p.is_match(path))
    }

    /// True for every path when the set is empty, else true on any match.
    pub fn is_included(&self, path: &Path) -> bool {
        self.is_empty() || self.matches(path)
    }

    /// False for every path when the set is empty, else true on any match.
    pub fn is_excluded(&self, path: &Path) -> bool {
        !self.is_empty() && self.matches(path)
    }

    /// Predicate form of [`PatternSet::is_included`].
    pub fn include_predicate(&self) -> impl Fn(&Path) -> bool + '_ {
        move |path| self.is_included(path)
    }

    /// Predicate form of [`PatternSet::is_excluded`].
    pub fn exclude_predicate(&self) -> impl Fn(&Path) -> bool + '_ {
        move |path| self.is_excluded(path)
    }
}

/// Splits settings-file content into trimmed, non-empty pattern lines.
pub fn parse_pattern_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}
