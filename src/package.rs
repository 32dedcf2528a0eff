//! Package-wide defaults shared by every rule of a packaging run.

use crate::defaults::normalize_destination;
use log::{Level, Log, Record};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_MODE: u32 = 0o644;
pub const DEFAULT_OWNER: &str = "root";
pub const DEFAULT_GROUP: &str = "root";

/// Holds the defaults a rule falls back to, plus the diagnostic sink.
///
/// A descriptor is configured once, then wrapped in an [`Arc`] and handed to
/// rules, which only keep a weak reference to it.
pub struct PackageDescriptor {
    name: String,
    version: String,
    release: String,
    arch: String,
    summary: String,
    build_root: PathBuf,
    default_mode: u32,
    default_owner: String,
    default_group: String,
    default_destination: Option<String>,
    log: Arc<dyn Log>,
}

impl PackageDescriptor {
    pub fn new(build_root: impl Into<PathBuf>, log: Arc<dyn Log>) -> Self {
        Self {
            name: String::new(),
            version: "0.0.0".to_string(),
            release: "1".to_string(),
            arch: "noarch".to_string(),
            summary: String::new(),
            build_root: build_root.into(),
            default_mode: DEFAULT_MODE,
            default_owner: DEFAULT_OWNER.to_string(),
            default_group: DEFAULT_GROUP.to_string(),
            default_destination: None,
            log,
        }
    }

    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    pub fn set_build_root(&mut self, build_root: impl Into<PathBuf>) {
        self.build_root = build_root.into();
    }

    pub const fn default_mode(&self) -> u32 {
        self.default_mode
    }

    pub const fn set_default_mode(&mut self, mode: u32) {
        self.default_mode = mode;
    }

    pub fn default_owner(&self) -> &str {
        &self.default_owner
    }

    pub fn set_default_owner(&mut self, owner: impl Into<String>) {
        self.default_owner = owner.into();
    }

    pub fn default_group(&self) -> &str {
        &self.default_group
    }

    pub fn set_default_group(&mut self, group: impl Into<String>) {
        self.default_group = group.into();
    }

    /// Returns the default destination, always separator-terminated.
    pub fn default_destination(&self) -> Option<&str> {
        self.default_destination.as_deref()
    }

    /// Sets the default destination. Empty or `None` unsets it.
    pub fn set_default_destination(&mut self, destination: Option<&str>) {
        self.default_destination = normalize_destination(destination);
    }

    pub const fn log(&self) -> &Arc<dyn Log> {
        &self.log
    }

    pub fn set_log(&mut self, log: Arc<dyn Log>) {
        self.log = log;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    pub fn release(&self) -> &str {
        &self.release
    }

    pub fn set_release(&mut self, release: impl Into<String>) {
        self.release = release.into();
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn set_arch(&mut self, arch: impl Into<String>) {
        self.arch = arch.into();
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = summary.into();
    }

    /// `name-version-release.arch`, or `package` when unnamed.
    pub fn nevra(&self) -> String {
        if self.name.is_empty() {
            return "package".to_string();
        }
        format!(
            "{}-{}-{}.{}",
            self.name, self.version, self.release, self.arch
        )
    }

    /// Sends one message to the package's log sink.
    pub fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        self.log.log(
            &Record::builder()
                .level(level)
                .target(env!("CARGO_PKG_NAME"))
                .args(args)
                .build(),
        );
    }
}

impl fmt::Debug for PackageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageDescriptor")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("release", &self.release)
            .field("arch", &self.arch)
            .field("build_root", &self.build_root)
            .field("default_mode", &format_args!("{:04o}", self.default_mode))
            .field("default_owner", &self.default_owner)
            .field("default_group", &self.default_group)
            .field("default_destination", &self.default_destination)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::StderrLogger;

    fn descriptor() -> PackageDescriptor {
        PackageDescriptor::new("/build", Arc::new(StderrLogger::quiet()))
    }

    #[test]
    fn test_defaults() {
        let package = descriptor();
        assert_eq!(package.default_mode(), 0o644);
        assert_eq!(package.default_owner(), "root");
        assert_eq!(package.default_group(), "root");
        assert_eq!(package.default_destination(), None);
        assert_eq!(package.build_root(), Path::new("/build"));
    }

    #[test]
    fn test_default_destination_normalization() {
        let mut package = descriptor();

        package.set_default_destination(Some("/var/www/test"));
        assert_eq!(package.default_destination(), Some("/var/www/test/"));

        package.set_default_destination(Some("/opt/app/"));
        assert_eq!(package.default_destination(), Some("/opt/app/"));

        package.set_default_destination(Some(""));
        assert_eq!(package.default_destination(), None);

        package.set_default_destination(Some("/srv"));
        package.set_default_destination(None);
        assert_eq!(package.default_destination(), None);
    }

    #[test]
    fn test_mode_owner_group_stored_verbatim() {
        let mut package = descriptor();
        package.set_default_mode(0o600);
        package.set_default_owner("");
        package.set_default_group("wheel");

        assert_eq!(package.default_mode(), 0o600);
        assert_eq!(package.default_owner(), "");
        assert_eq!(package.default_group(), "wheel");
    }

    #[test]
    fn test_nevra() {
        let mut package = descriptor();
        assert_eq!(package.nevra(), "package");

        package.set_name("webapp");
        package.set_version("1.2.0");
        package.set_release("3");
        package.set_arch("x86_64");
        assert_eq!(package.nevra(), "webapp-1.2.0-3.x86_64");
    }

    #[test]
    fn test_log_is_shared() {
        let log: Arc<dyn Log> = Arc::new(StderrLogger::quiet());
        let package = PackageDescriptor::new("/build", Arc::clone(&log));
        assert!(Arc::ptr_eq(package.log(), &log));
    }
}
