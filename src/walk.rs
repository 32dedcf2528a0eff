//! Directory walking with pattern-based filtering.

use crate::error::{Result, RuleError};
use crate::pattern::{to_slash, DirDecision, PatternSet};

use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};

/// Type of a scanned entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// A filesystem entry selected by a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedEntry {
    /// Absolute source path.
    pub path: PathBuf,
    /// Path relative to the scanned directory.
    pub relative_path: PathBuf,
    pub kind: EntryKind,
    pub link_target: Option<PathBuf>,
    pub size: u64,
}

/// Creates a scanned entry from path and metadata.
fn create_entry(path: &Path, relative_path: PathBuf, metadata: &Metadata) -> Result<ScannedEntry> {
    let kind = if metadata.file_type().is_symlink() {
        EntryKind::Symlink
    } else if metadata.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };

    let link_target = if kind == EntryKind::Symlink {
        Some(fs::read_link(path).map_err(|e| RuleError::io(path, e))?)
    } else {
        None
    };

    let size = if kind == EntryKind::File {
        metadata.len()
    } else {
        0
    };

    Ok(ScannedEntry {
        path: path.to_path_buf(),
        relative_path,
        kind,
        link_target,
        size,
    })
}

/// Recursively walks a directory, collecting entries the patterns select.
fn walk_directory(
    dir: &Path,
    root: &Path,
    patterns: &PatternSet,
    results: &mut Vec<ScannedEntry>,
) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| RuleError::io(dir, e))?
        .map(|entry| entry.map_err(|e| RuleError::io(dir, e)))
        .collect::<Result<Vec<_>>>()?;

    // Sort for deterministic ordering
    entries.sort_by_key(fs::DirEntry::path);

    for entry in entries {
        let path = entry.path();
        let relative = path
            .strip_prefix(root)
            .map_or_else(|_| path.clone(), Path::to_path_buf);
        let Some(relative_str) = to_slash(&relative) else {
            return Err(RuleError::NonUtf8Path { path });
        };

        // Symlinks are listed, never followed
        let metadata = path
            .symlink_metadata()
            .map_err(|e| RuleError::io(&path, e))?;

        if metadata.is_dir() {
            match patterns.directory(&relative_str) {
                DirDecision::Prune => continue,
                DirDecision::List => {
                    results.push(create_entry(&path, relative, &metadata)?);
                }
                DirDecision::Descend => {}
            }
            walk_directory(&path, root, patterns, results)?;
        } else if patterns.selects_file(&relative_str) {
            results.push(create_entry(&path, relative, &metadata)?);
        }
    }

    Ok(())
}

/// Collects entries below `root` selected by `patterns`, sorted by relative path.
///
/// `root` itself may be a symlink to a directory; links below it are not
/// followed. A missing `root` yields `Ok(None)` so callers can decide how
/// loud to be.
pub fn collect_entries(root: &Path, patterns: &PatternSet) -> Result<Option<Vec<ScannedEntry>>> {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(RuleError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(RuleError::io(root, e)),
    }

    let mut results = Vec::new();
    walk_directory(root, root, patterns, &mut results)?;

    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    results.dedup_by(|a, b| a.path == b.path);

    Ok(Some(results))
}
