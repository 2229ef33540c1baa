//! Shared fixtures for goenv-archive integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use goenv_archive::{compress, BundleReader, PatternSet};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Relative path -> file contents (`None` for directories).
pub type Snapshot = BTreeMap<String, Option<Vec<u8>>>;

/// Creates `<tmp>/myenv` with a small environment-like tree.
pub fn create_env_tree() -> anyhow::Result<TempDir> {
    let temp_dir = TempDir::new()?;
    let base = temp_dir.path().join("myenv");

    fs::create_dir_all(base.join("src/app/.git"))?;
    fs::create_dir_all(base.join("pkg/mod/cache"))?;
    fs::create_dir_all(base.join("bin"))?;
    fs::create_dir_all(base.join("empty"))?;

    fs::write(base.join("activate"), "export GOPATH=$GOENV_ROOT/myenv\n")?;
    fs::write(base.join("src/app/main.go"), "package main\n\nfunc main() {}\n")?;
    fs::write(base.join("src/app/.gitignore"), "bin/\n")?;
    fs::write(base.join("src/app/.git/HEAD"), "ref: refs/heads/main\n")?;
    fs::write(base.join("pkg/mod/cache/blob"), vec![7u8; 4096])?;
    fs::write(base.join("bin/tool"), b"\x7fELF fake binary")?;

    Ok(temp_dir)
}

/// Records every node under `root`, keyed by its path relative to `root`.
pub fn snapshot(root: &Path) -> Snapshot {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| {
            let entry = entry.unwrap();
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            let content = entry
                .file_type()
                .is_file()
                .then(|| fs::read(entry.path()).unwrap());
            (rel, content)
        })
        .collect()
}

/// Compresses `source` into memory with the given exclude values.
pub fn bundle(source: &Path, excludes: &[&str]) -> Vec<u8> {
    let patterns = PatternSet::from_values(excludes).unwrap();
    let mut sink = Vec::new();
    compress(source, &mut sink, patterns.exclude_predicate()).unwrap();
    sink
}

pub fn reader(bytes: Vec<u8>) -> BundleReader<'static> {
    BundleReader::new(Cursor::new(bytes), false)
}
