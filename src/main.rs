//! # rpmstage
//!
//! Resolve the `[[rule]]` tables of a package manifest against a build tree,
//! preview the resulting RPM payload, report files no rule claims, and stage
//! the payload into an archive.

use anyhow::{Context, Result};
use bytesize::ByteSize;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use rpmstage::config::{self, Config, Manifest, MANIFEST_FILE};
use rpmstage::{
    archive, assemble, AssemblyReport, Directive, EntryKind, FileSelectionRule,
    PackageDescriptor, PayloadManifest, StderrLogger,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Supported staging archive formats.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Format {
    /// Plain tar archive
    Tar,
    /// Gzip-compressed tar archive
    #[value(name = "tar.gz", alias = "tgz")]
    TarGz,
    /// Bzip2-compressed tar archive
    #[value(name = "tar.bz2", alias = "tbz2")]
    TarBz2,
    /// Zstandard-compressed tar archive
    #[value(name = "tar.zst", alias = "tzst")]
    TarZst,
    /// Zip archive
    Zip,
}

impl Format {
    /// Returns the file extension for this format.
    const fn extension(self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
            Self::TarZst => "tar.zst",
            Self::Zip => "zip",
        }
    }
}

/// rpmstage - resolve packaging rules into RPM payload entries
#[derive(Parser, Debug)]
#[command(name = "rpmstage")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Package manifest (defaults to ./rpmstage.toml)
    #[arg(default_value = MANIFEST_FILE)]
    pub manifest: PathBuf,

    /// Override the manifest's build root
    #[arg(short, long, value_name = "DIR")]
    pub build_root: Option<PathBuf>,

    /// Staging archive to write (defaults to name-version-release.arch with the format's extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Staging archive format (defaults to config, then tar.gz)
    #[arg(short, long, value_enum)]
    pub format: Option<Format>,

    /// Preview mode - show the resolved payload without writing an archive
    #[arg(short, long)]
    pub preview: bool,

    /// Show entry sizes in the preview
    #[arg(short, long)]
    pub size: bool,

    /// List files under the build root that no rule claims
    #[arg(short, long)]
    pub unpackaged: bool,

    /// Zero timestamps in the staging archive
    #[arg(short, long)]
    pub reproducible: bool,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose output - show rules and per-file resolution
    #[arg(short, long)]
    pub verbose: bool,

    /// List recognized rule directives
    #[arg(long)]
    pub list_directives: bool,

    /// Show config file location and current settings
    #[arg(long)]
    pub show_config: bool,

    /// Initialize config file with defaults
    #[arg(long)]
    pub init_config: bool,

    /// Open config file in $EDITOR (creates if missing)
    #[arg(long)]
    pub edit_config: bool,
}

/// Prints the recognized directive vocabulary.
fn print_directive_list() {
    println!("{}", "Rule directives:".bold());
    println!();
    for directive in Directive::ALL {
        println!(
            "  {:<10} {}",
            directive.name().cyan(),
            directive.description().dimmed()
        );
    }
}

/// Prints each rule's declaration in verbose mode.
fn print_rules_verbose(rules: &[FileSelectionRule], verbose: bool) {
    if !verbose {
        return;
    }

    for (i, rule) in rules.iter().enumerate() {
        println!("Rule #{} ({}):", i + 1, rule.base().cyan());
        for pattern in rule.includes() {
            println!("  {} {}", "+".green(), pattern);
        }
        for pattern in rule.excludes() {
            println!("  {} {}", "-".red(), pattern);
        }
        if !rule.directives().is_empty() {
            println!("  {} {}", "%".yellow(), rule.directives());
        }
    }
}

/// Displays the resolved payload.
fn preview_payload(package: &PackageDescriptor, payload: &PayloadManifest, args: &Args) {
    let header = format!("Payload of {}", package.nevra());
    println!("{}", header.bold().green());
    if !package.summary().is_empty() {
        println!("{}", package.summary().dimmed());
    }
    println!();

    for entry in payload.entries() {
        if args.size {
            let size_str = match entry.kind {
                EntryKind::Symlink => "    link".to_string(),
                EntryKind::Directory => "     dir".to_string(),
                EntryKind::File => format!("{:>10}", ByteSize(entry.size)),
            };
            print!("  {} ", size_str.dimmed());
        } else {
            print!("  ");
        }

        print!(
            "{} {:<8} {:<8} {}",
            format!("{:04o}", entry.mode).dimmed(),
            entry.owner,
            entry.group,
            entry.destination
        );

        if let Some(ref target) = entry.link_target {
            print!("{}{}", " -> ".cyan(), target.display().to_string().cyan());
        }
        if !entry.directives.is_empty() {
            print!(" {}", format!("[{}]", entry.directives).yellow());
        }
        println!();
    }

    let symlink_count = payload
        .entries()
        .iter()
        .filter(|e| e.kind == EntryKind::Symlink)
        .count();

    println!();
    println!(
        "{} {} entries ({} symlinks), {} total",
        "Summary:".bold(),
        payload.len(),
        symlink_count,
        ByteSize(payload.total_size())
    );
}

/// Lists files nobody claimed, relative to the build root.
fn print_unpackaged(package: &PackageDescriptor, report: &AssemblyReport) {
    if report.unpackaged.is_empty() {
        println!("{}", "Every file under the build root is packaged.".green());
        return;
    }

    println!("{}", "Files not packaged by any rule:".bold().yellow());
    for path in &report.unpackaged {
        let shown = path.strip_prefix(package.build_root()).unwrap_or(path);
        println!("  {}", shown.display().to_string().dimmed());
    }
}

/// Determines the output path for the staging archive.
fn get_output_path(args: &Args, package: &PackageDescriptor, format: Format) -> PathBuf {
    if let Some(ref output) = args.output {
        return output.clone();
    }
    PathBuf::from(format!("{}.{}", package.nevra(), format.extension()))
}

/// Resolves the archive format: CLI, then config, then tar.gz.
fn resolve_format(args: &Args, config: &Config) -> Result<Format> {
    if let Some(format) = args.format {
        return Ok(format);
    }
    let Some(name) = config.defaults.format.as_deref() else {
        return Ok(Format::TarGz);
    };
    Format::from_str(name, true).map_err(|e| anyhow::anyhow!("Invalid format in config: {e}"))
}

/// Handle config-related commands (--init-config, --edit-config, --show-config).
/// Returns Ok(true) if a command was handled and we should exit.
fn handle_config_commands(args: &Args, config: &Config) -> Result<bool> {
    if args.init_config {
        let path = config::init_config()?;
        println!(
            "Created config file: {}",
            path.display().to_string().green()
        );
        return Ok(true);
    }

    if args.edit_config {
        let path = config::edit_config()?;
        println!("Opened: {}", path.display().to_string().green());
        return Ok(true);
    }

    if args.show_config {
        config::show_config(config);
        return Ok(true);
    }

    Ok(false)
}

/// Create the staging archive in the specified format.
fn create_archive(
    output: &Path,
    payload: &PayloadManifest,
    format: Format,
    args: &Args,
) -> Result<()> {
    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let writer = BufWriter::new(file);
    let entries = payload.entries();

    match format {
        Format::Tar => {
            archive::create_tar(writer, entries, args.reproducible, args.quiet, args.verbose)
        }
        Format::TarGz => {
            archive::create_tar_gz(writer, entries, args.reproducible, args.quiet, args.verbose)
        }
        Format::TarBz2 => {
            archive::create_tar_bz2(writer, entries, args.reproducible, args.quiet, args.verbose)
        }
        Format::TarZst => {
            archive::create_tar_zst(writer, entries, args.reproducible, args.quiet, args.verbose)
        }
        Format::Zip => {
            archive::create_zip(writer, entries, args.reproducible, args.quiet, args.verbose)
        }
    }
}

/// Loads the manifest and builds the package descriptor and its rules.
fn load_package(
    args: &Args,
    config: &Config,
) -> Result<(Arc<PackageDescriptor>, Vec<FileSelectionRule>)> {
    if !args.manifest.exists() {
        anyhow::bail!("Manifest does not exist: {}", args.manifest.display());
    }

    let manifest = Manifest::load(&args.manifest)?;
    let manifest_dir = args
        .manifest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let log = Arc::new(StderrLogger::from_flags(args.quiet, args.verbose));
    let mut package = manifest.package_descriptor(manifest_dir, config, log);
    if let Some(ref root) = args.build_root {
        package.set_build_root(root.clone());
    }

    if !package.build_root().is_dir() {
        anyhow::bail!(
            "Build root does not exist: {}",
            package.build_root().display()
        );
    }

    let package = Arc::new(package);
    let rules = manifest.rules(&package)?;
    Ok((package, rules))
}

fn main() -> Result<()> {
    let mut args = Args::parse();
    let config = config::load_config();

    // Handle config commands first
    if handle_config_commands(&args, &config)? {
        return Ok(());
    }

    if args.list_directives {
        print_directive_list();
        return Ok(());
    }

    // Hint at the config file (only when actually staging, not in quiet mode)
    if !args.quiet && !args.preview && !config::config_exists() {
        eprintln!(
            "{} Running with defaults. Use {} to customize.",
            "ℹ".blue(),
            "--edit-config".cyan()
        );
    }

    if config.defaults.reproducible {
        args.reproducible = true;
    }
    let format = resolve_format(&args, &config)?;

    let (package, rules) = load_package(&args, &config)?;

    if rules.is_empty() {
        println!("{}", "Manifest declares no rules!".yellow());
        return Ok(());
    }

    if !args.quiet {
        println!(
            "📦 Resolving {} rules under {}...",
            rules.len(),
            package.build_root().display()
        );
    }
    print_rules_verbose(&rules, args.verbose);

    let mut payload = PayloadManifest::new();
    let report = assemble(&package, &rules, &mut payload)?;

    if args.unpackaged {
        print_unpackaged(&package, &report);
    }

    if payload.is_empty() {
        println!("{}", "No files to package!".yellow());
        return Ok(());
    }

    if args.preview || args.size {
        preview_payload(&package, &payload, &args);
        if args.preview {
            return Ok(());
        }
    }

    let output = get_output_path(&args, &package, format);

    if !args.quiet {
        println!(
            "📦 Staging {} with {} entries...",
            output.display().to_string().cyan(),
            payload.len()
        );
    }

    create_archive(&output, &payload, format, &args)?;

    if !args.quiet {
        let output_size = std::fs::metadata(&output)?.len();
        println!(
            "📦 Done! {} → {}",
            ByteSize(payload.total_size()),
            ByteSize(output_size)
        );
    }

    Ok(())
}
