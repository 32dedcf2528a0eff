//! Staging archive creation for various formats.
//!
//! Entries are stored at their install destination (without the leading `/`)
//! with the rule-resolved mode and owner/group names.

use crate::payload::PayloadEntry;
use crate::walk::EntryKind;

use anyhow::{Context, Result};
use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use flate2::Compression as GzCompression;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io::{self, Write};
use std::time::UNIX_EPOCH;
use time::OffsetDateTime;
use zstd::stream::write::Encoder as ZstdEncoder;

const PROGRESS_TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} entries";

/// Creates a progress bar for archive operations.
pub fn create_progress_bar(len: u64, quiet: bool, verbose: bool) -> Option<ProgressBar> {
    if quiet || verbose {
        return None;
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_TEMPLATE) {
        pb.set_style(style.progress_chars("━━─"));
    }
    Some(pb)
}

/// Archive member name for an entry: destination without the leading `/`.
pub fn member_name(entry: &PayloadEntry) -> &str {
    entry.destination.trim_start_matches('/')
}

/// Source modification time, or 0 in reproducible mode.
fn source_mtime(entry: &PayloadEntry, reproducible: bool) -> u64 {
    if reproducible {
        return 0;
    }
    fs::symlink_metadata(&entry.source)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs())
}

/// Sets tar header metadata from a payload entry.
pub fn set_header_metadata(
    header: &mut tar::Header,
    entry: &PayloadEntry,
    reproducible: bool,
) -> Result<()> {
    header.set_mtime(source_mtime(entry, reproducible));
    header.set_uid(0);
    header.set_gid(0);
    header
        .set_username(&entry.owner)
        .with_context(|| format!("Owner name too long: {}", entry.owner))?;
    header
        .set_groupname(&entry.group)
        .with_context(|| format!("Group name too long: {}", entry.group))?;
    header.set_mode(entry.mode);
    Ok(())
}

/// Creates a tar archive from the given entries.
pub fn create_tar<W: Write>(
    writer: W,
    entries: &[PayloadEntry],
    reproducible: bool,
    quiet: bool,
    verbose: bool,
) -> Result<()> {
    let mut builder = tar::Builder::new(writer);
    let progress = create_progress_bar(entries.len() as u64, quiet, verbose);

    for entry in entries {
        let name = member_name(entry);
        if name.is_empty() {
            // The filesystem root is implied
            continue;
        }

        let mut header = tar::Header::new_gnu();
        set_header_metadata(&mut header, entry, reproducible)?;

        match entry.kind {
            EntryKind::Symlink => {
                if let Some(ref target) = entry.link_target {
                    header.set_entry_type(tar::EntryType::Symlink);
                    header.set_size(0);
                    builder.append_link(&mut header, name, target)?;
                }
            }
            EntryKind::File => {
                let file = File::open(&entry.source)
                    .with_context(|| format!("Failed to open {}", entry.source.display()))?;
                header.set_entry_type(tar::EntryType::Regular);
                header.set_size(file.metadata()?.len());
                builder.append_data(&mut header, name, file)?;
            }
            EntryKind::Directory => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
                builder.append_data(&mut header, name, io::empty())?;
            }
        }

        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    builder.finish()?;
    Ok(())
}

/// Creates a zip archive from the given entries.
pub fn create_zip<W: Write + io::Seek>(
    writer: W,
    entries: &[PayloadEntry],
    reproducible: bool,
    quiet: bool,
    verbose: bool,
) -> Result<()> {
    use zip::write::SimpleFileOptions;
    use zip::CompressionMethod;

    let mut zip = zip::ZipWriter::new(writer);
    let progress = create_progress_bar(entries.len() as u64, quiet, verbose);

    for entry in entries {
        let name = member_name(entry);
        if name.is_empty() {
            continue;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let last_modified = if reproducible {
            zip::DateTime::default()
        } else {
            #[allow(clippy::cast_possible_wrap)]
            let dt = OffsetDateTime::from_unix_timestamp(source_mtime(entry, false) as i64)
                .unwrap_or(OffsetDateTime::UNIX_EPOCH);
            zip::DateTime::from_date_and_time(
                dt.year() as u16,
                dt.month() as u8,
                dt.day(),
                dt.hour(),
                dt.minute(),
                dt.second(),
            )
            .unwrap_or_default()
        };

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(last_modified)
            .unix_permissions(entry.mode & 0o7777);

        match entry.kind {
            EntryKind::Symlink => {
                if let Some(ref target) = entry.link_target {
                    // Store symlink target as file content (zip convention for some tools)
                    zip.start_file(name, options.unix_permissions(0o777))?;
                    zip.write_all(target.to_string_lossy().as_bytes())?;
                }
            }
            EntryKind::File => {
                zip.start_file(name, options)?;
                let mut file = File::open(&entry.source)
                    .with_context(|| format!("Failed to open {}", entry.source.display()))?;
                io::copy(&mut file, &mut zip)?;
            }
            EntryKind::Directory => {
                zip.add_directory(name, options)?;
            }
        }

        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    zip.finish()?;
    Ok(())
}

/// Creates a gzip-compressed tar archive.
pub fn create_tar_gz<W: Write>(
    writer: W,
    entries: &[PayloadEntry],
    reproducible: bool,
    quiet: bool,
    verbose: bool,
) -> Result<()> {
    let encoder = GzEncoder::new(writer, GzCompression::default());
    create_tar(encoder, entries, reproducible, quiet, verbose)
}

/// Creates a bzip2-compressed tar archive.
pub fn create_tar_bz2<W: Write>(
    writer: W,
    entries: &[PayloadEntry],
    reproducible: bool,
    quiet: bool,
    verbose: bool,
) -> Result<()> {
    let encoder = BzEncoder::new(writer, bzip2::Compression::best());
    create_tar(encoder, entries, reproducible, quiet, verbose)
}

/// Creates a zstd-compressed tar archive.
pub fn create_tar_zst<W: Write>(
    writer: W,
    entries: &[PayloadEntry],
    reproducible: bool,
    quiet: bool,
    verbose: bool,
) -> Result<()> {
    let encoder = ZstdEncoder::new(writer, 3)?.auto_finish();
    create_tar(encoder, entries, reproducible, quiet, verbose)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::DirectiveSet;
    use std::io::Read;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn file_entry(source: PathBuf, destination: &str) -> PayloadEntry {
        PayloadEntry {
            source,
            destination: destination.to_string(),
            owner: "apache".to_string(),
            group: "web".to_string(),
            mode: 0o640,
            directives: DirectiveSet::CONFIG,
            kind: EntryKind::File,
            link_target: None,
            size: 5,
        }
    }

    #[test]
    fn test_member_name_strips_root() {
        let entry = file_entry(PathBuf::from("/x"), "/etc/app/app.conf");
        assert_eq!(member_name(&entry), "etc/app/app.conf");
    }

    #[test]
    fn test_tar_carries_owner_group_and_mode() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("app.conf");
        fs::write(&source, "hello").unwrap();

        let mut dir = file_entry(tmp.path().to_path_buf(), "/etc/app");
        dir.kind = EntryKind::Directory;
        dir.mode = 0o750;
        let entries = vec![dir, file_entry(source, "/etc/app/app.conf")];

        let mut buf = Vec::new();
        create_tar(&mut buf, &entries, true, true, false).unwrap();

        let mut archive = tar::Archive::new(buf.as_slice());
        let mut seen = Vec::new();
        for member in archive.entries().unwrap() {
            let mut member = member.unwrap();
            let header = member.header().clone();
            let path = member
                .path()
                .unwrap()
                .to_string_lossy()
                .trim_end_matches('/')
                .to_string();
            assert_eq!(header.username().unwrap(), Some("apache"));
            assert_eq!(header.groupname().unwrap(), Some("web"));
            assert_eq!(header.mtime().unwrap(), 0);
            if path == "etc/app/app.conf" {
                let mut content = String::new();
                member.read_to_string(&mut content).unwrap();
                assert_eq!(content, "hello");
                assert_eq!(header.mode().unwrap(), 0o640);
            } else {
                assert_eq!(header.entry_type(), tar::EntryType::Directory);
                assert_eq!(header.mode().unwrap(), 0o750);
            }
            seen.push(path);
        }

        assert_eq!(seen, vec!["etc/app", "etc/app/app.conf"]);
    }

    #[test]
    fn test_root_directory_entry_is_skipped() {
        let mut root = file_entry(PathBuf::from("/"), "/");
        root.kind = EntryKind::Directory;

        let mut buf = Vec::new();
        create_tar(&mut buf, &[root], true, true, false).unwrap();

        let mut archive = tar::Archive::new(buf.as_slice());
        assert_eq!(archive.entries().unwrap().count(), 0);
    }
}
