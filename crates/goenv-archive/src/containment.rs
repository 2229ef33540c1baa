//! Path containment for extraction targets.
//!
//! Entry names and link targets come from the bundle producer. Both are
//! first resolved lexically and rejected when they would land outside the
//! extraction target. Links created earlier in the same run can still
//! redirect a lexically clean path, so writes are also checked against what
//! is already on disk.

use std::fs;
use std::path::{Component, Path, PathBuf};

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use crate::error::{Error, Result};

/// Resolves an entry name under `target`.
///
/// Rejects absolute names, `..` components and embedded NUL bytes.
pub fn resolve_entry(target: &Path, name: &str) -> Result<PathBuf> {
    if name.contains('\0') {
        return Err(Error::invalid_entry_name(name));
    }

    let mut relative = Utf8PathBuf::new();
    for component in Utf8Path::new(name).components() {
        match component {
            Utf8Component::Normal(part) => relative.push(part),
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir | Utf8Component::RootDir | Utf8Component::Prefix(_) => {
                return Err(Error::path_escape(name, target.join(name)));
            }
        }
    }

    Ok(target.join(relative.as_std_path()))
}

/// Resolves a symlink target relative to the link's own location.
///
/// `link_name` is the (already contained) entry name of the link; the
/// returned path is where the link would point inside `target`.
pub fn resolve_link_target(target: &Path, link_name: &str, link_target: &str) -> Result<PathBuf> {
    let escape = || Error::path_escape(link_name, target.join(link_name).with_file_name(link_target));

    if link_target.contains('\0') {
        return Err(Error::invalid_entry_name(link_target));
    }

    let mut resolved: Vec<&str> = Utf8Path::new(link_name)
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| match c {
                    Utf8Component::Normal(part) => Some(part),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    for component in Utf8Path::new(link_target).components() {
        match component {
            Utf8Component::Normal(part) => resolved.push(part),
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if resolved.pop().is_none() {
                    return Err(escape());
                }
            }
            Utf8Component::RootDir | Utf8Component::Prefix(_) => return Err(escape()),
        }
    }

    Ok(resolved.iter().fold(target.to_path_buf(), |path, part| path.join(part)))
}

/// Fails when an existing symlink between `target` and `path` resolves
/// outside `root`, the canonical form of `target`.
///
/// With `include_leaf` the final component is checked too, since opening an
/// existing link for writing follows it. Dangling links are rejected.
pub fn verify_on_disk(
    root: &Path,
    target: &Path,
    entry: &str,
    path: &Path,
    include_leaf: bool,
) -> Result<()> {
    let relative = path
        .strip_prefix(target)
        .map_err(|_| Error::path_escape(entry, path))?;
    let components: Vec<Component<'_>> = relative.components().collect();
    let checked = if include_leaf {
        components.len()
    } else {
        components.len().saturating_sub(1)
    };

    let mut current = target.to_path_buf();
    for component in &components[..checked] {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                let resolved = fs::canonicalize(&current)
                    .map_err(|_| Error::path_escape(entry, &current))?;
                if !resolved.starts_with(root) {
                    return Err(Error::path_escape(entry, resolved));
                }
            }
            Ok(_) => {}
            // Nothing below a missing component exists yet.
            Err(_) => break,
        }
    }

    Ok(())
}

/// Fails when a freshly created link at `path` resolves outside `root`.
///
/// Dangling links are accepted here; writing through them is refused by
/// [`verify_on_disk`].
pub fn verify_link(root: &Path, entry: &str, path: &Path) -> Result<()> {
    match fs::canonicalize(path) {
        Ok(resolved) if !resolved.starts_with(root) => Err(Error::path_escape(entry, resolved)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> &'static Path {
        Path::new("/opt/goenv/envs")
    }

    #[test]
    fn test_resolve_relative_entry() {
        assert_eq!(
            resolve_entry(target(), "env/bin/activate").unwrap(),
            target().join("env/bin/activate")
        );
        assert_eq!(
            resolve_entry(target(), "./env/").unwrap(),
            target().join("env")
        );
    }

    #[test]
    fn test_reject_parent_components() {
        let err = resolve_entry(target(), "env/../../etc/passwd").unwrap_err();
        assert!(matches!(err, Error::PathEscape { .. }), "got {:?}", err);
    }

    #[test]
    fn test_reject_absolute_entry() {
        let err = resolve_entry(target(), "/etc/passwd").unwrap_err();
        assert!(matches!(err, Error::PathEscape { .. }));
    }

    #[test]
    fn test_reject_nul() {
        let err = resolve_entry(target(), "env/a\0b").unwrap_err();
        assert!(matches!(err, Error::InvalidEntryName { .. }));
    }

    #[test]
    fn test_link_target_inside() {
        assert_eq!(
            resolve_link_target(target(), "env/bin/go", "../go/bin/go").unwrap(),
            target().join("env/go/bin/go")
        );
        assert_eq!(
            resolve_link_target(target(), "env/current", "v1").unwrap(),
            target().join("env/v1")
        );
    }

    #[test]
    fn test_link_target_escapes() {
        let err = resolve_link_target(target(), "env/current", "../../outside").unwrap_err();
        assert!(matches!(err, Error::PathEscape { .. }));

        let err = resolve_link_target(target(), "env/current", "/usr/bin").unwrap_err();
        assert!(matches!(err, Error::PathEscape { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_verify_on_disk_follows_existing_links() {
        use std::os::unix::fs::symlink;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let target = temp_dir.path().join("sandbox");
        fs::create_dir_all(target.join("env/real")).unwrap();
        fs::create_dir(temp_dir.path().join("outside")).unwrap();
        symlink("real", target.join("env/inside")).unwrap();
        symlink(temp_dir.path().join("outside"), target.join("env/out")).unwrap();
        symlink("missing", target.join("env/dangling")).unwrap();
        let root = fs::canonicalize(&target).unwrap();

        let check = |name: &str, leaf: bool| {
            verify_on_disk(&root, &target, name, &target.join(name), leaf)
        };

        assert!(check("env/inside/file", true).is_ok());
        assert!(check("env/new/deeper/file", true).is_ok());
        assert!(matches!(
            check("env/out/file", true),
            Err(Error::PathEscape { .. })
        ));
        assert!(matches!(check("env/out", true), Err(Error::PathEscape { .. })));
        // A link entry replaces the leaf instead of writing through it.
        assert!(check("env/out", false).is_ok());
        assert!(matches!(
            check("env/dangling", true),
            Err(Error::PathEscape { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_verify_link() {
        use std::os::unix::fs::symlink;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let target = temp_dir.path().join("sandbox");
        fs::create_dir_all(target.join("env")).unwrap();
        symlink("..", target.join("env/up")).unwrap();
        symlink("../..", target.join("env/upup")).unwrap();
        symlink("nowhere", target.join("env/dangling")).unwrap();
        let root = fs::canonicalize(&target).unwrap();

        assert!(verify_link(&root, "env/up", &target.join("env/up")).is_ok());
        assert!(verify_link(&root, "env/dangling", &target.join("env/dangling")).is_ok());
        assert!(matches!(
            verify_link(&root, "env/upup", &target.join("env/upup")),
            Err(Error::PathEscape { .. })
        ));
    }
}
