//! Recursive listing of a mount subtree.
//!
//! Used by the reconciliation sweep and by directory listings. Runs blocking
//! `walkdir` traversal, so callers drive it through the mount's I/O pool.
//! Probe files, symlinks and special files are never reported.

use std::path::Path;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

use super::probe::PROBE_FILE_PREFIX;
use super::MountError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Directory,
}

/// One file or directory below a listed path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    /// `/`-separated path relative to the listed directory
    pub name: String,
    pub entry_type: EntryType,
    /// Zero for directories
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl FileEntry {
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }
}

/// Everything found under one root, plus per-entry failures.
#[derive(Debug, Default)]
pub(crate) struct TreeWalk {
    pub entries: Vec<FileEntry>,
    pub errors: Vec<String>,
}

fn is_probe_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
        && entry.file_name().to_string_lossy().starts_with(PROBE_FILE_PREFIX)
}

/// Walk `root` recursively. Entries are sorted by name.
///
/// A root that is missing, not a directory or unreadable is an error; any
/// failure below it is recorded in [`TreeWalk::errors`] and the walk goes on.
pub(crate) fn walk_tree(root: &Path) -> Result<TreeWalk, MountError> {
    let meta = std::fs::metadata(root).map_err(|e| MountError::io(root, e))?;
    if !meta.is_dir() {
        return Err(MountError::NotADirectory(root.to_path_buf()));
    }

    let mut walk = TreeWalk::default();
    let mut walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_probe_file(e));

    while let Some(item) = walker.next() {
        let entry = match item {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                let depth = e.depth();
                let err = MountError::io(path, std::io::Error::from(e));
                if depth == 0 {
                    return Err(err);
                }
                walk.errors.push(err.to_string());
                continue;
            }
        };

        let file_type = entry.file_type();
        let entry_type = if file_type.is_dir() {
            EntryType::Directory
        } else if file_type.is_file() {
            EntryType::File
        } else {
            continue;
        };

        let Some(name) = relative_name(root, entry.path()) else {
            warn!(path = %entry.path().display(), "Skipping entry with a non UTF-8 name");
            walk.errors.push(format!("{}: name is not valid UTF-8", entry.path().display()));
            if entry_type == EntryType::Directory {
                walker.skip_current_dir();
            }
            continue;
        };

        let meta = match entry.metadata() {
            Ok(meta) => meta,
            Err(e) => {
                let err = MountError::io(entry.path(), std::io::Error::from(e));
                walk.errors.push(err.to_string());
                continue;
            }
        };

        walk.entries.push(FileEntry {
            name,
            entry_type,
            size: if meta.is_file() { meta.len() } else { 0 },
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
        });
    }

    walk.entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(walk)
}

/// `None` when any component is not valid UTF-8; such a name could not be
/// addressed again through [`Mount::resolve`](super::Mount::resolve).
fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_walk_lists_nested_entries_sorted() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/b/deep.json"), b"12345").unwrap();
        fs::write(dir.path().join("top.txt"), b"top").unwrap();

        let walk = walk_tree(dir.path()).unwrap();

        let names: Vec<_> = walk.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "a/b", "a/b/deep.json", "top.txt"]);
        assert_eq!(walk.entries[0].entry_type, EntryType::Directory);
        assert_eq!(walk.entries[0].size, 0);
        assert_eq!(walk.entries[2].size, 5);
        assert!(walk.entries[2].is_file());
        assert!(walk.entries[2].modified.is_some());
        assert!(walk.errors.is_empty());
    }

    #[test]
    fn test_walk_skips_probe_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("health_check_local_1_abc.tmp"), b"probe").unwrap();
        fs::write(dir.path().join("real.txt"), b"data").unwrap();

        let walk = walk_tree(dir.path()).unwrap();

        assert_eq!(walk.entries.len(), 1);
        assert_eq!(walk.entries[0].name, "real.txt");
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_skips_symlinks() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("target.txt"), b"t").unwrap();
        std::os::unix::fs::symlink(dir.path().join("target.txt"), dir.path().join("link.txt")).unwrap();

        let walk = walk_tree(dir.path()).unwrap();

        assert_eq!(walk.entries.len(), 1);
        assert_eq!(walk.entries[0].name, "target.txt");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_walk_reports_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff.txt")), b"x").unwrap();
        fs::write(dir.path().join("good.txt"), b"y").unwrap();

        let walk = walk_tree(dir.path()).unwrap();

        assert_eq!(walk.entries.len(), 1);
        assert_eq!(walk.entries[0].name, "good.txt");
        assert_eq!(walk.errors.len(), 1);
        assert!(walk.errors[0].contains("not valid UTF-8"));
    }

    #[test]
    fn test_walk_missing_root_is_error() {
        let dir = tempdir().unwrap();
        let err = walk_tree(&dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, MountError::Io { ref source, .. } if source.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn test_walk_file_root_is_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("plain"), b"x").unwrap();
        let err = walk_tree(&dir.path().join("plain")).unwrap_err();
        assert!(matches!(err, MountError::NotADirectory(_)));
    }
}
