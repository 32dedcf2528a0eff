//! A packaging run: every rule of a package resolved in declaration order.

use crate::error::Result;
use crate::package::PackageDescriptor;
use crate::pattern::PatternSet;
use crate::payload::{ArchiveBuilder, PayloadEntry};
use crate::rule::FileSelectionRule;
use crate::walk::collect_entries;

use log::Level;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

/// Outcome of a packaging run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Entries registered per rule, in declaration order.
    pub per_rule: Vec<usize>,
    /// Source paths claimed by at least one rule.
    pub claimed: BTreeSet<PathBuf>,
    /// Regular files under the build root no rule claimed.
    pub unpackaged: Vec<PathBuf>,
    /// Destinations registered more than once, with their sources.
    pub duplicates: Vec<(String, Vec<PathBuf>)>,
}

impl AssemblyReport {
    pub fn total(&self) -> usize {
        self.per_rule.iter().sum()
    }
}

/// Records destinations on their way to the real builder.
struct Tracking<'a> {
    inner: &'a mut dyn ArchiveBuilder,
    destinations: HashMap<String, Vec<PathBuf>>,
    order: Vec<String>,
}

impl ArchiveBuilder for Tracking<'_> {
    fn add_entry(&mut self, entry: PayloadEntry) -> Result<()> {
        let sources = self
            .destinations
            .entry(entry.destination.clone())
            .or_default();
        if sources.is_empty() {
            self.order.push(entry.destination.clone());
        }
        sources.push(entry.source.clone());
        self.inner.add_entry(entry)
    }
}

/// Resolves `rules` strictly in order and registers their entries with
/// `builder`. The first failing rule aborts the run.
pub fn assemble(
    package: &PackageDescriptor,
    rules: &[FileSelectionRule],
    builder: &mut dyn ArchiveBuilder,
) -> Result<AssemblyReport> {
    let mut report = AssemblyReport::default();
    let mut tracking = Tracking {
        inner: builder,
        destinations: HashMap::new(),
        order: Vec::new(),
    };

    for (i, rule) in rules.iter().enumerate() {
        package.emit(
            Level::Debug,
            format_args!("Resolving rule #{} (base {})", i + 1, rule.base()),
        );
        let registered = rule.add_files(&mut tracking)?;
        report.per_rule.push(registered.len());
        report.claimed.extend(registered);
    }

    for destination in tracking.order {
        if let Some(sources) = tracking.destinations.remove(&destination) {
            if sources.len() > 1 {
                package.emit(
                    Level::Warn,
                    format_args!(
                        "Destination {} registered {} times",
                        destination,
                        sources.len()
                    ),
                );
                report.duplicates.push((destination, sources));
            }
        }
    }

    report.unpackaged = unpackaged_files(package, &report.claimed)?;
    Ok(report)
}

/// Regular files and symlinks under the build root that are not in `claimed`.
pub fn unpackaged_files(
    package: &PackageDescriptor,
    claimed: &BTreeSet<PathBuf>,
) -> Result<Vec<PathBuf>> {
    let entries =
        collect_entries(package.build_root(), &PatternSet::everything())?.unwrap_or_default();

    Ok(entries
        .into_iter()
        .map(|entry| entry.path)
        .filter(|path| !claimed.contains(path))
        .collect())
}
