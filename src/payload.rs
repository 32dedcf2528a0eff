//! Payload entries handed to the archive-writing collaborator.

use crate::directive::DirectiveSet;
use crate::error::Result;
use crate::walk::EntryKind;
use std::path::PathBuf;

/// One resolved payload entry: where it comes from, where it lands, and
/// the metadata it is installed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEntry {
    pub source: PathBuf,
    /// Absolute install path inside the package (always `/`-separated).
    pub destination: String,
    pub owner: String,
    pub group: String,
    pub mode: u32,
    pub directives: DirectiveSet,
    pub kind: EntryKind,
    pub link_target: Option<PathBuf>,
    pub size: u64,
}

/// Receives resolved entries from rules.
pub trait ArchiveBuilder {
    fn add_entry(&mut self, entry: PayloadEntry) -> Result<()>;
}

/// In-memory, ordered collection of payload entries.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PayloadManifest {
    entries: Vec<PayloadEntry>,
}

impl PayloadManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[PayloadEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<PayloadEntry> {
        self.entries
    }

    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of regular file sizes.
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    pub fn find(&self, destination: &str) -> Option<&PayloadEntry> {
        self.entries.iter().find(|e| e.destination == destination)
    }
}

impl ArchiveBuilder for PayloadManifest {
    fn add_entry(&mut self, entry: PayloadEntry) -> Result<()> {
        self.entries.push(entry);
        Ok(())
    }
}

impl<B: ArchiveBuilder + ?Sized> ArchiveBuilder for &mut B {
    fn add_entry(&mut self, entry: PayloadEntry) -> Result<()> {
        (**self).add_entry(entry)
    }
}
