//! Include/exclude glob evaluation for a single rule.
//!
//! Patterns are matched against paths relative to the rule's base, using `/`
//! separators. `*` and `?` never cross a separator; `**` matches any number of
//! directories. A pattern with a trailing `/` is a directory pattern:
//!
//! - include `conf/`: the `conf` directory entry itself plus everything below it
//! - exclude `cache/`: the `cache` directory and everything below it (pruned)

use crate::error::{Result, RuleError};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Component, Path};

/// Kind of pattern, decided by its trailing separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Entry,
    Directory,
}

/// What the walker should do with a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirDecision {
    /// List the directory entry and descend into it.
    List,
    /// Descend without listing the directory itself.
    Descend,
    /// Skip the directory and everything below it.
    Prune,
}

/// Compiled include/exclude patterns of one rule.
#[derive(Debug, Clone)]
pub struct PatternSet {
    has_includes: bool,
    include_files: GlobSet,
    include_dirs: GlobSet,
    exclude_entries: GlobSet,
    exclude_dirs: GlobSet,
}

impl PatternSet {
    /// Compiles include and exclude lists. Blank patterns are ignored.
    pub fn new<S: AsRef<str>>(includes: &[S], excludes: &[S]) -> Result<Self> {
        let mut include_files = GlobSetBuilder::new();
        let mut include_dirs = GlobSetBuilder::new();
        let mut exclude_entries = GlobSetBuilder::new();
        let mut exclude_dirs = GlobSetBuilder::new();
        let mut has_includes = false;

        for raw in includes {
            let Some((pattern, kind)) = analyze_pattern(raw.as_ref()) else {
                continue;
            };
            has_includes = true;
            match kind {
                PatternKind::Entry => {
                    include_files.add(compile(raw.as_ref(), &pattern)?);
                }
                PatternKind::Directory => {
                    let contents = format!("{pattern}/**");
                    include_files.add(compile(raw.as_ref(), &contents)?);
                    include_dirs.add(compile(raw.as_ref(), &pattern)?);
                    include_dirs.add(compile(raw.as_ref(), &contents)?);
                }
            }
        }

        for raw in excludes {
            let Some((pattern, kind)) = analyze_pattern(raw.as_ref()) else {
                continue;
            };
            match kind {
                PatternKind::Entry => exclude_entries.add(compile(raw.as_ref(), &pattern)?),
                PatternKind::Directory => exclude_dirs.add(compile(raw.as_ref(), &pattern)?),
            };
        }

        Ok(Self {
            has_includes,
            include_files: finish(&include_files)?,
            include_dirs: finish(&include_dirs)?,
            exclude_entries: finish(&exclude_entries)?,
            exclude_dirs: finish(&exclude_dirs)?,
        })
    }

    /// A set that selects every file and no directory.
    pub fn everything() -> Self {
        Self {
            has_includes: false,
            include_files: GlobSet::empty(),
            include_dirs: GlobSet::empty(),
            exclude_entries: GlobSet::empty(),
            exclude_dirs: GlobSet::empty(),
        }
    }

    /// Any include matches, or there are no includes at all.
    pub fn is_included(&self, relative: &str) -> bool {
        !self.has_includes || self.include_files.is_match(relative)
    }

    pub fn is_excluded(&self, relative: &str) -> bool {
        self.exclude_entries.is_match(relative)
    }

    /// Decision for a non-directory entry (regular file or symlink).
    pub fn selects_file(&self, relative: &str) -> bool {
        self.is_included(relative) && !self.is_excluded(relative)
    }

    /// Decision for a directory entry.
    pub fn directory(&self, relative: &str) -> DirDecision {
        if self.exclude_dirs.is_match(relative) {
            DirDecision::Prune
        } else if self.include_dirs.is_match(relative) && !self.is_excluded(relative) {
            DirDecision::List
        } else {
            DirDecision::Descend
        }
    }
}

/// Strips `./` and leading `/`, and splits off a trailing `/`.
/// Returns `None` for patterns that can never match anything.
fn analyze_pattern(raw: &str) -> Option<(String, PatternKind)> {
    let trimmed = raw.trim();
    let kind = if trimmed.ends_with('/') {
        PatternKind::Directory
    } else {
        PatternKind::Entry
    };

    let mut body = trimmed.strip_suffix('/').unwrap_or(trimmed);
    loop {
        if let Some(rest) = body.strip_prefix("./") {
            body = rest;
        } else if let Some(rest) = body.strip_prefix('/') {
            body = rest;
        } else {
            break;
        }
    }

    if body.is_empty() {
        return None;
    }
    Some((body.to_string(), kind))
}

fn compile(original: &str, pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| RuleError::InvalidPattern {
            pattern: original.to_string(),
            source,
        })
}

fn finish(builder: &GlobSetBuilder) -> Result<GlobSet> {
    builder.build().map_err(|source| RuleError::InvalidPattern {
        pattern: "<set>".to_string(),
        source,
    })
}

/// Renders a relative path with `/` separators for matching.
///
/// Returns `None` when a component is not valid UTF-8.
pub fn to_slash(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            parts.push(part.to_str()?);
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(includes: &[&str], excludes: &[&str]) -> PatternSet {
        PatternSet::new(includes, excludes).unwrap()
    }

    #[test]
    fn test_analyze_entry_pattern() {
        assert_eq!(
            analyze_pattern("*.conf"),
            Some(("*.conf".to_string(), PatternKind::Entry))
        );
    }

    #[test]
    fn test_analyze_directory_pattern() {
        assert_eq!(
            analyze_pattern("conf/"),
            Some(("conf".to_string(), PatternKind::Directory))
        );
    }

    #[test]
    fn test_analyze_strips_anchors() {
        assert_eq!(
            analyze_pattern("./lib/*.so"),
            Some(("lib/*.so".to_string(), PatternKind::Entry))
        );
        assert_eq!(
            analyze_pattern("/lib/*.so"),
            Some(("lib/*.so".to_string(), PatternKind::Entry))
        );
    }

    #[test]
    fn test_analyze_blank() {
        assert_eq!(analyze_pattern("   "), None);
        assert_eq!(analyze_pattern("/"), None);
    }

    #[test]
    fn test_empty_includes_match_everything() {
        let patterns = set(&[], &[]);
        assert!(patterns.selects_file("a.txt"));
        assert!(patterns.selects_file("deep/nested/b.bin"));
    }

    #[test]
    fn test_star_does_not_cross_separator() {
        let patterns = set(&["*.txt"], &[]);
        assert!(patterns.selects_file("a.txt"));
        assert!(!patterns.selects_file("sub/a.txt"));
    }

    #[test]
    fn test_double_star_recurses() {
        let patterns = set(&["**/*.txt"], &[]);
        assert!(patterns.selects_file("a.txt"));
        assert!(patterns.selects_file("sub/deeper/a.txt"));
        assert!(!patterns.selects_file("sub/a.md"));
    }

    #[test]
    fn test_question_mark() {
        let patterns = set(&["file?.log"], &[]);
        assert!(patterns.selects_file("file1.log"));
        assert!(!patterns.selects_file("file10.log"));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let patterns = set(&["**/*.txt"], &["secret.txt"]);
        assert!(patterns.selects_file("public.txt"));
        assert!(!patterns.selects_file("secret.txt"));
    }

    #[test]
    fn test_exclude_without_includes() {
        let patterns = set(&[], &["**/*.bak"]);
        assert!(patterns.selects_file("keep.txt"));
        assert!(!patterns.selects_file("old/keep.txt.bak"));
    }

    #[test]
    fn test_directory_include_lists_dir_and_contents() {
        let patterns = set(&["conf/"], &[]);
        assert_eq!(patterns.directory("conf"), DirDecision::List);
        assert_eq!(patterns.directory("conf/sub"), DirDecision::List);
        assert_eq!(patterns.directory("other"), DirDecision::Descend);
        assert!(patterns.selects_file("conf/app.conf"));
        assert!(!patterns.selects_file("other/app.conf"));
    }

    #[test]
    fn test_directory_exclude_prunes() {
        let patterns = set(&[], &["cache/"]);
        assert_eq!(patterns.directory("cache"), DirDecision::Prune);
        assert_eq!(patterns.directory("src"), DirDecision::Descend);
        // A file named like the directory is not affected
        assert!(patterns.selects_file("cache"));
    }

    #[test]
    fn test_entry_exclude_hides_listed_directory() {
        let patterns = set(&["conf/"], &["conf/private"]);
        assert_eq!(patterns.directory("conf/private"), DirDecision::Descend);
    }

    #[test]
    fn test_directories_not_listed_without_directory_pattern() {
        let patterns = set(&["**"], &[]);
        assert_eq!(patterns.directory("anything"), DirDecision::Descend);
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PatternSet::new(&["[unclosed"], &[]).unwrap_err();
        let RuleError::InvalidPattern { pattern, .. } = &err else {
            panic!("expected an invalid pattern error, got {err:?}");
        };
        assert_eq!(pattern, "[unclosed");
    }

    #[test]
    fn test_to_slash() {
        assert_eq!(
            to_slash(Path::new("a/b/c.txt")).as_deref(),
            Some("a/b/c.txt")
        );
        assert_eq!(to_slash(Path::new("./a")).as_deref(), Some("a"));
    }
}
