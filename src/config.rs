//! Package manifest and user configuration handling.

use crate::directive::InvalidDirectiveError;
use crate::package::PackageDescriptor;
use crate::rule::FileSelectionRule;

use anyhow::Context;
use colored::Colorize;
use log::Log;
use serde::{de, Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Default manifest file name, looked up in the current directory.
pub const MANIFEST_FILE: &str = "rpmstage.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("rule #{rule}: {source}")]
    Directive {
        rule: usize,
        #[source]
        source: InvalidDirectiveError,
    },
}

/// Parses a permission mode: `"0644"`, `"644"` or `"0o644"`.
pub fn parse_mode(text: &str) -> Result<u32, String> {
    let text = text.trim();
    let digits = text.strip_prefix("0o").unwrap_or(text);
    let mode = u32::from_str_radix(digits, 8).map_err(|_| format!("invalid mode: {text:?}"))?;
    check_mode(mode)
}

fn check_mode(mode: u32) -> Result<u32, String> {
    if mode > 0o7777 {
        Err(format!("mode out of range: {mode:o}"))
    } else {
        Ok(mode)
    }
}

/// Accepts a TOML integer (`0o644`) or an octal string (`"0644"`).
fn deserialize_mode<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawMode {
        Int(u32),
        Text(String),
    }

    let mode = match RawMode::deserialize(deserializer)? {
        RawMode::Int(mode) => check_mode(mode),
        RawMode::Text(text) => parse_mode(&text),
    };
    mode.map(Some).map_err(de::Error::custom)
}

// ============================================================================
// Package manifest
// ============================================================================

/// Package manifest (`rpmstage.toml`).
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    pub package: PackageSection,
    #[serde(rename = "rule")]
    pub rules: Vec<RuleSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageSection {
    pub name: String,
    pub version: Option<String>,
    pub release: Option<String>,
    pub arch: Option<String>,
    pub summary: String,
    /// Build root, relative to the manifest's directory.
    pub build_root: Option<PathBuf>,
    #[serde(deserialize_with = "deserialize_mode")]
    pub default_mode: Option<u32>,
    pub default_owner: Option<String>,
    pub default_group: Option<String>,
    pub default_destination: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleSection {
    pub base: Option<String>,
    pub destination: Option<String>,
    #[serde(deserialize_with = "deserialize_mode")]
    pub mode: Option<u32>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub directives: Vec<String>,
}

impl RuleSection {
    /// Builds a rule attached to `package`.
    pub fn to_rule(
        &self,
        package: &Arc<PackageDescriptor>,
    ) -> Result<FileSelectionRule, InvalidDirectiveError> {
        let mut rule = FileSelectionRule::new(package);
        rule.set_base(self.base.as_deref());
        rule.set_destination(self.destination.as_deref());
        rule.set_file_mode(self.mode);
        rule.set_owner(self.owner.as_deref());
        rule.set_group(self.group.as_deref());
        rule.set_includes(self.includes.iter().cloned());
        rule.set_excludes(self.excludes.iter().cloned());
        rule.set_directives(&self.directives)?;
        Ok(rule)
    }
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds the package descriptor. Manifest values win over user
    /// defaults; `build_root` resolves against `manifest_dir`.
    pub fn package_descriptor(
        &self,
        manifest_dir: &Path,
        user: &Config,
        log: Arc<dyn Log>,
    ) -> PackageDescriptor {
        let section = &self.package;
        let build_root = section
            .build_root
            .as_ref()
            .map_or_else(
                || manifest_dir.to_path_buf(),
                |root| manifest_dir.join(root),
            );

        let mut package = PackageDescriptor::new(build_root, log);
        package.set_name(section.name.clone());
        if let Some(ref version) = section.version {
            package.set_version(version.clone());
        }
        if let Some(ref release) = section.release {
            package.set_release(release.clone());
        }
        if let Some(ref arch) = section.arch {
            package.set_arch(arch.clone());
        }
        package.set_summary(section.summary.clone());

        if let Some(mode) = section.default_mode.or(user.defaults.mode) {
            package.set_default_mode(mode);
        }
        if let Some(owner) = section
            .default_owner
            .as_ref()
            .or(user.defaults.owner.as_ref())
        {
            package.set_default_owner(owner.clone());
        }
        if let Some(group) = section
            .default_group
            .as_ref()
            .or(user.defaults.group.as_ref())
        {
            package.set_default_group(group.clone());
        }
        package.set_default_destination(section.default_destination.as_deref());
        package
    }

    /// Builds every rule, in declaration order.
    pub fn rules(
        &self,
        package: &Arc<PackageDescriptor>,
    ) -> Result<Vec<FileSelectionRule>, ConfigError> {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, section)| {
                section
                    .to_rule(package)
                    .map_err(|source| ConfigError::Directive {
                        rule: i + 1,
                        source,
                    })
            })
            .collect()
    }
}

// ============================================================================
// User configuration
// ============================================================================

/// User configuration.
///
/// Located at `~/.config/rpmstage/config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Owner used when a manifest sets no `default_owner`
    pub owner: Option<String>,
    /// Group used when a manifest sets no `default_group`
    pub group: Option<String>,
    /// Mode used when a manifest sets no `default_mode`
    #[serde(deserialize_with = "deserialize_mode")]
    pub mode: Option<u32>,
    /// Default staging archive format
    pub format: Option<String>,
    /// Default to reproducible staging archives
    pub reproducible: bool,
}

/// Returns the path to the config file.
/// Always uses ~/.config/rpmstage/config.toml for consistency across platforms.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|d| d.join(".config").join("rpmstage").join("config.toml"))
}

/// Check if config file exists.
pub fn config_exists() -> bool {
    config_path().is_some_and(|p| p.exists())
}

/// Loads the config file, returning defaults if not found.
pub fn load_config() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };

    if !path.exists() {
        return Config::default();
    }

    fs::read_to_string(&path).map_or_else(
        |_| Config::default(),
        |contents| toml::from_str(&contents).unwrap_or_default(),
    )
}

const DEFAULT_CONFIG: &str = r#"# rpmstage configuration
# Location: ~/.config/rpmstage/config.toml

[defaults]
# Ownership applied when a package manifest sets none
# owner = "root"
# group = "root"

# Mode applied when a package manifest sets none (octal string or 0o integer)
# mode = "0644"

# Default staging archive format (tar, tar.gz, tar.bz2, tar.zst, zip)
# format = "tar.gz"

# Always create reproducible staging archives
# reproducible = false
"#;

/// Creates a default config file.
pub fn init_config() -> anyhow::Result<PathBuf> {
    let path = config_path().context("Could not determine config directory")?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&path, DEFAULT_CONFIG)?;
    Ok(path)
}

/// Opens config file in $EDITOR, creating it first if needed.
pub fn edit_config() -> anyhow::Result<PathBuf> {
    let path = config_path().context("Could not determine config directory")?;

    if !path.exists() {
        init_config()?;
    }

    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| "vi".to_string());

    std::process::Command::new(&editor)
        .arg(&path)
        .status()
        .with_context(|| format!("Failed to open editor: {editor}"))?;

    Ok(path)
}

/// Shows current config.
pub fn show_config(config: &Config) {
    let path = config_path();

    println!("{}", "rpmstage configuration".bold());
    println!();

    match path {
        Some(ref p) if p.exists() => {
            println!("Config file: {}", p.display().to_string().green());
        }
        Some(ref p) => {
            println!("Config file: {} {}", p.display(), "(not created)".dimmed());
            println!(
                "  Run {} to create and edit",
                "rpmstage --edit-config".cyan()
            );
        }
        None => println!("Config file: {}", "not available".yellow()),
    }

    println!();
    println!("{}", "Current settings:".bold());

    let unset = || "(unset)".dimmed().to_string();
    println!(
        "  defaults.owner: {}",
        config.defaults.owner.clone().unwrap_or_else(unset)
    );
    println!(
        "  defaults.group: {}",
        config.defaults.group.clone().unwrap_or_else(unset)
    );
    println!(
        "  defaults.mode: {}",
        config
            .defaults
            .mode
            .map_or_else(unset, |m| format!("{m:04o}"))
    );
    if let Some(ref fmt) = config.defaults.format {
        println!("  defaults.format: {fmt}");
    }
    println!("  defaults.reproducible: {}", config.defaults.reproducible);

    println!();
    println!("{}", "Usage:".bold());
    println!(
        "  Use {} to see what a manifest packages:",
        "--preview".cyan()
    );
    println!("    rpmstage rpmstage.toml --preview");
    println!();
    println!(
        "  Use {} to list files no rule claims:",
        "--unpackaged".cyan()
    );
}
