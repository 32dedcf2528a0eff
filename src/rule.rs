//! File-selection rules: which files of the build tree go into the package,
//! where they land, and with which ownership, mode and directives.
//!
//! Every metadata accessor comes in two flavors: the plain getter returns
//! what the rule itself declares, the `*_or_default` getter falls back to the
//! owning [`PackageDescriptor`].

use crate::defaults::{
    destination_or, mode_or, name_or, normalize_base, normalize_destination, normalize_name,
    SEPARATOR,
};
use crate::directive::{Directive, DirectiveSet, InvalidDirectiveError};
use crate::error::{Result, RuleError};
use crate::package::PackageDescriptor;
use crate::pattern::{to_slash, PatternSet};
use crate::payload::{ArchiveBuilder, PayloadEntry};
use crate::walk::{collect_entries, EntryKind, ScannedEntry};

use log::{Level, Log};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Weak};

/// Mode used for symlink entries.
const SYMLINK_MODE: u32 = 0o777;

/// One packaging rule, attached to a package descriptor it does not own.
#[derive(Debug, Clone)]
pub struct FileSelectionRule {
    package: Weak<PackageDescriptor>,
    base: String,
    destination: Option<String>,
    file_mode: Option<u32>,
    owner: Option<String>,
    group: Option<String>,
    includes: Vec<String>,
    excludes: Vec<String>,
    directives: DirectiveSet,
}

impl FileSelectionRule {
    pub fn new(package: &Arc<PackageDescriptor>) -> Self {
        Self {
            package: Arc::downgrade(package),
            base: normalize_base(None),
            destination: None,
            file_mode: None,
            owner: None,
            group: None,
            includes: Vec::new(),
            excludes: Vec::new(),
            directives: DirectiveSet::empty(),
        }
    }

    /// Returns the owning package, if it is still alive.
    pub fn package(&self) -> Result<Arc<PackageDescriptor>> {
        self.package.upgrade().ok_or(RuleError::DetachedRule)
    }

    pub fn set_package(&mut self, package: &Arc<PackageDescriptor>) {
        self.package = Arc::downgrade(package);
    }

    pub fn log(&self) -> Result<Arc<dyn Log>> {
        Ok(Arc::clone(self.package()?.log()))
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Sets the base directory, relative to the build root.
    /// Unset or empty means the build root itself.
    pub fn set_base(&mut self, base: Option<&str>) {
        self.base = normalize_base(base);
    }

    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    pub fn set_destination(&mut self, destination: Option<&str>) {
        self.destination = normalize_destination(destination);
    }

    pub fn destination_or_default(&self) -> Result<Option<String>> {
        let package = self.package()?;
        Ok(destination_or(self.destination(), package.default_destination()))
    }

    pub const fn file_mode(&self) -> Option<u32> {
        self.file_mode
    }

    pub const fn set_file_mode(&mut self, mode: Option<u32>) {
        self.file_mode = mode;
    }

    pub fn mode_or_default(&self) -> Result<u32> {
        Ok(mode_or(self.file_mode, self.package()?.default_mode()))
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn set_owner(&mut self, owner: Option<&str>) {
        self.owner = normalize_name(owner);
    }

    pub fn owner_or_default(&self) -> Result<String> {
        Ok(name_or(self.owner(), self.package()?.default_owner()))
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn set_group(&mut self, group: Option<&str>) {
        self.group = normalize_name(group);
    }

    pub fn group_or_default(&self) -> Result<String> {
        Ok(name_or(self.group(), self.package()?.default_group()))
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn set_includes<I, S>(&mut self, includes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes = includes.into_iter().map(Into::into).collect();
    }

    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    pub fn set_excludes<I, S>(&mut self, excludes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes = excludes.into_iter().map(Into::into).collect();
    }

    pub const fn directives(&self) -> DirectiveSet {
        self.directives
    }

    /// Validates and stores directive tokens. On error the previous
    /// directives are kept.
    pub fn set_directives<S: AsRef<str>>(
        &mut self,
        tokens: &[S],
    ) -> std::result::Result<(), InvalidDirectiveError> {
        self.directives = DirectiveSet::parse(tokens)?;
        Ok(())
    }

    /// Absolute directory this rule scans: build root joined with base.
    ///
    /// A base with `..` components would leave the build root and is rejected.
    pub fn scan_path(&self) -> Result<PathBuf> {
        let package = self.package()?;
        let relative = Path::new(self.base.trim_matches(SEPARATOR));
        if relative.components().any(|c| c == Component::ParentDir) {
            return Err(RuleError::BaseOutsideBuildRoot {
                base: self.base.clone(),
            });
        }
        if relative.as_os_str().is_empty() {
            Ok(package.build_root().to_path_buf())
        } else {
            Ok(package.build_root().join(relative))
        }
    }

    /// Resolves the rule to its selected entries, sorted by relative path.
    ///
    /// A missing base directory resolves to nothing and is reported as a
    /// warning on the package log.
    pub fn list_entries(&self) -> Result<Vec<ScannedEntry>> {
        Ok(self.resolve()?.unwrap_or_default())
    }

    /// Resolves the rule to absolute source paths, sorted and deduplicated.
    pub fn list_files(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .list_entries()?
            .into_iter()
            .map(|entry| entry.path)
            .collect())
    }

    /// Registers every resolved entry with `builder` and returns the source
    /// paths that were registered.
    pub fn add_files(&self, builder: &mut dyn ArchiveBuilder) -> Result<Vec<PathBuf>> {
        let package = self.package()?;
        let destination = self
            .destination_or_default()?
            .ok_or_else(|| RuleError::MissingDestination {
                base: self.base.clone(),
            })?;
        let owner = self.owner_or_default()?;
        let group = self.group_or_default()?;
        let mode = self.mode_or_default()?;

        let Some(entries) = self.resolve()? else {
            return Ok(Vec::new());
        };

        let mut registered = Vec::with_capacity(entries.len() + 1);

        if self.directives.has(Directive::Dir) {
            let source = self.scan_path()?;
            builder.add_entry(PayloadEntry {
                source: source.clone(),
                destination: directory_destination(&destination),
                owner: owner.clone(),
                group: group.clone(),
                mode: directory_mode(mode),
                directives: self.directives,
                kind: EntryKind::Directory,
                link_target: None,
                size: 0,
            })?;
            registered.push(source);
        }

        for entry in entries {
            let Some(relative) = to_slash(&entry.relative_path) else {
                return Err(RuleError::NonUtf8Path { path: entry.path });
            };
            let target = format!("{destination}{relative}");
            let entry_mode = match entry.kind {
                EntryKind::File => mode,
                EntryKind::Directory => directory_mode(mode),
                EntryKind::Symlink => SYMLINK_MODE,
            };

            package.emit(
                Level::Debug,
                format_args!(
                    "{} -> {} ({:04o})",
                    entry.path.display(),
                    target,
                    entry_mode
                ),
            );

            builder.add_entry(PayloadEntry {
                source: entry.path.clone(),
                destination: target,
                owner: owner.clone(),
                group: group.clone(),
                mode: entry_mode,
                directives: self.directives,
                kind: entry.kind,
                link_target: entry.link_target,
                size: entry.size,
            })?;
            registered.push(entry.path);
        }

        Ok(registered)
    }

    fn resolve(&self) -> Result<Option<Vec<ScannedEntry>>> {
        let package = self.package()?;
        let scan_path = self.scan_path()?;
        let patterns = PatternSet::new(&self.includes, &self.excludes)?;

        let entries = collect_entries(&scan_path, &patterns)?;
        let Some(found) = &entries else {
            package.emit(
                Level::Warn,
                format_args!(
                    "Rule base directory does not exist: {}",
                    scan_path.display()
                ),
            );
            return Ok(None);
        };
        package.emit(
            Level::Debug,
            format_args!(
                "Rule {}: {} entries in {}",
                self.base,
                found.len(),
                scan_path.display()
            ),
        );
        Ok(entries)
    }
}

/// Adds search permission wherever read permission is granted.
pub const fn directory_mode(mode: u32) -> u32 {
    mode | ((mode & 0o444) >> 2)
}

fn directory_destination(destination: &str) -> String {
    let trimmed = destination.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() {
        SEPARATOR.to_string()
    } else {
        trimmed.to_string()
    }
}
