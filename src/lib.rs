//! # rpmstage
//!
//! Resolve declarative file rules into RPM payload entries.
//!
//! ## Model
//!
//! - A [`PackageDescriptor`] holds package-wide defaults: build root, default
//!   mode, owner, group and destination, plus the diagnostic log sink.
//! - A [`FileSelectionRule`] selects files below a base directory with glob
//!   includes/excludes and decides each file's destination, ownership, mode and
//!   directives, falling back to the package defaults.
//! - [`assemble`] resolves every rule in declaration order and hands the
//!   resulting [`PayloadEntry`] values to an [`ArchiveBuilder`].
//!
//! ## Pattern semantics
//!
//! Patterns are relative to the rule's base. `*` and `?` stay within one path
//! component, `**` spans directories. An empty include list selects every
//! file. A trailing `/` makes a directory pattern.

pub mod archive;
pub mod assembly;
pub mod config;
pub mod defaults;
pub mod directive;
pub mod error;
pub mod logger;
pub mod package;
pub mod pattern;
pub mod payload;
pub mod rule;
pub mod walk;

pub use assembly::{assemble, AssemblyReport};
pub use directive::{Directive, DirectiveSet, InvalidDirectiveError};
pub use error::RuleError;
pub use logger::StderrLogger;
pub use package::PackageDescriptor;
pub use payload::{ArchiveBuilder, PayloadEntry, PayloadManifest};
pub use rule::FileSelectionRule;
pub use walk::{EntryKind, ScannedEntry};
