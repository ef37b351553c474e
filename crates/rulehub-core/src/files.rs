//! Directory listing and path containment.
//!
//! Listing is deliberately forgiving: a category directory that does not
//! exist (or cannot be read) simply has no files. Containment is strict: a
//! path is managed only if, after canonicalization, it lies strictly below
//! the storage root.

use crate::error::{Result, RuleHubError};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// List regular files in `dir` whose names end with one of `extensions`.
///
/// Suffixes match case-insensitively; an empty extension set accepts every
/// file. Missing or unreadable directories yield an empty list. Names are
/// returned sorted.
pub fn list_files(dir: &Path, extensions: &[String]) -> Vec<String> {
    match try_list_files(dir, extensions) {
        Ok(names) => names,
        Err(err) => {
            debug!(dir = %dir.display(), error = %err, "Listing degraded to empty");
            Vec::new()
        }
    }
}

fn try_list_files(dir: &Path, extensions: &[String]) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| RuleHubError::directory_unavailable(dir, e))?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| has_allowed_extension(name, extensions))
        .collect();

    names.sort();
    Ok(names)
}

/// Check a filename against an extension set (case-insensitive suffix match).
pub fn has_allowed_extension(name: &str, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    let name_lower = name.to_lowercase();
    extensions
        .iter()
        .any(|ext| name_lower.ends_with(&ext.to_lowercase()))
}

/// Canonical containment test.
///
/// Both paths are canonicalized, then `path` is relativized against `root`.
/// The result must be non-empty, must not climb out with `..`, and must not
/// be absolute. `Path::strip_prefix` works on whole components, so a sibling
/// such as `/data/hub-old` is never mistaken for a child of `/data/hub`.
pub fn is_managed(root: &Path, path: &Path) -> bool {
    managed_relative(root, path).is_some()
}

/// The part of `path` below `root` after canonicalization, if it is managed.
pub fn managed_relative(root: &Path, path: &Path) -> Option<PathBuf> {
    let root = canonicalize_lenient(root);
    let path = canonicalize_lenient(path);

    let relative = path.strip_prefix(&root).ok()?;
    if relative.as_os_str().is_empty() || relative.is_absolute() {
        return None;
    }

    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then(|| relative.to_path_buf())
}

/// Canonicalize a path that may not exist yet.
///
/// The nearest existing ancestor is canonicalized and the remaining
/// components re-joined, so creation targets can be checked before they
/// exist. If no ancestor resolves the path is returned unchanged.
pub fn canonicalize_lenient(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let mut missing = Vec::new();
    let mut current = path;
    while let Some(parent) = current.parent() {
        if let Some(name) = current.file_name() {
            missing.push(name.to_os_string());
        } else {
            break;
        }
        if let Ok(mut canonical) = parent.canonicalize() {
            for name in missing.iter().rev() {
                canonical.push(name);
            }
            return canonical;
        }
        current = parent;
    }

    path.to_path_buf()
}

/// Modification time of a file.
pub fn modified_time(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| RuleHubError::stat_unavailable(path, e))
}

/// Modification time in milliseconds since the epoch, or 0 if unavailable.
pub fn modified_millis_or_epoch(path: &Path) -> u128 {
    match modified_time(path) {
        Ok(time) => time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0),
        Err(err) => {
            debug!(error = %err, "Stat degraded to epoch");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_list_files_filters_extensions() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.md"), "").unwrap();
        fs::write(temp_dir.path().join("A.MD"), "").unwrap();
        fs::write(temp_dir.path().join("c.json"), "").unwrap();
        fs::create_dir(temp_dir.path().join("nested.md")).unwrap();

        let names = list_files(temp_dir.path(), &exts(&[".md"]));
        assert_eq!(names, vec!["A.MD", "b.md"]);
    }

    #[test]
    fn test_list_files_empty_extensions_accepts_all() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("x.txt"), "").unwrap();
        fs::write(temp_dir.path().join("y"), "").unwrap();

        let names = list_files(temp_dir.path(), &[]);
        assert_eq!(names, vec!["x.txt", "y"]);
    }

    #[test]
    fn test_list_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let names = list_files(&temp_dir.path().join("absent"), &exts(&[".md"]));
        assert!(names.is_empty());
    }

    #[test]
    fn test_is_managed_child() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("hub");
        fs::create_dir_all(root.join("categories/rule")).unwrap();
        fs::write(root.join("categories/rule/a.md"), "").unwrap();

        assert!(is_managed(&root, &root.join("categories/rule/a.md")));
        // Creation targets that do not exist yet
        assert!(is_managed(&root, &root.join("categories/rule/new.md")));
    }

    #[test]
    fn test_is_managed_rejects_prefix_sibling() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("hub");
        let sibling = temp_dir.path().join("hub-old");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&sibling).unwrap();
        fs::write(sibling.join("x"), "").unwrap();

        assert!(!is_managed(&root, &sibling.join("x")));
    }

    #[test]
    fn test_is_managed_rejects_root_and_escape() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("hub");
        fs::create_dir_all(root.join("categories")).unwrap();

        assert!(!is_managed(&root, &root));
        assert!(!is_managed(&root, &root.join("categories/../../escape.md")));
        assert!(!is_managed(&root, temp_dir.path()));
    }

    #[test]
    fn test_is_managed_nonexistent_root() {
        // Neither path exists; containment falls back to component comparison.
        assert!(!is_managed(Path::new("/data/hub"), Path::new("/data/hub-old/x")));
        assert!(is_managed(Path::new("/data/hub"), Path::new("/data/hub/x")));
    }

    #[test]
    fn test_modified_missing_file_is_epoch() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(modified_millis_or_epoch(&temp_dir.path().join("gone.md")), 0);

        let err = modified_time(&temp_dir.path().join("gone.md")).unwrap_err();
        assert!(err.is_degradable());
    }
}
