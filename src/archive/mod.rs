//! Source-tree archive bundles.
//!
//! A bundle is a zstd-compressed tar holding:
//!
//! ```text
//! <prefix>/...            every regular, non-dot file of the source tree
//! <metadata_name>         the optional extra metadata file
//! .build-metadata.json    {"git_hash", "build_date"} stamp, always last
//! ```
//!
//! Population is best effort: a file that cannot be added is reported and
//! skipped, and the stamp and final verification still run.

pub mod manifest;
pub mod metadata;
pub mod writer;

pub use manifest::{build_manifest, Manifest, ManifestEntry};
pub use metadata::{ArchiveMetadata, METADATA_ENTRY};
pub use writer::{list_entries, read_entry, read_metadata, ArchiveWriter};

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use time::OffsetDateTime;

use crate::preflight::check_source_dir;

/// Everything one archive build needs.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub archive_path: PathBuf,
    pub source_dir: PathBuf,
    /// Extra file appended at `metadata_name`; skipped with a warning when
    /// it does not exist.
    pub metadata_file: Option<PathBuf>,
    pub metadata_name: String,
    pub prefix: String,
    pub git_hash: String,
    pub compression_level: i32,
}

/// A file that could not be added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddFailure {
    pub source: PathBuf,
    pub reason: String,
}

/// Result of populating an archive from a manifest.
#[derive(Debug, Clone, Default)]
pub struct PopulateReport {
    pub added: usize,
    pub failures: Vec<AddFailure>,
}

/// Summary of a verified archive on disk.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub archive_path: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
    pub files_added: usize,
    pub files_failed: usize,
    pub metadata_file_added: bool,
}

/// Add every manifest entry, printing one line per added file.
///
/// Failures are printed as warnings and collected; they never stop the
/// remaining entries.
pub fn populate(writer: &mut ArchiveWriter, manifest: &Manifest) -> PopulateReport {
    let mut report = PopulateReport::default();
    for entry in manifest {
        match writer.add_file(&entry.source, &entry.archive_path) {
            Ok(()) => {
                report.added += 1;
                println!("Added: {}", entry.archive_path);
            }
            Err(e) => {
                eprintln!(
                    "  [WARN] Failed to add file {}: {:#}",
                    entry.source.display(),
                    e
                );
                report.failures.push(AddFailure {
                    source: entry.source.clone(),
                    reason: format!("{e:#}"),
                });
            }
        }
    }
    report
}

/// Add one optional file at `archive_path`.
///
/// Returns whether it was added. A missing file or a failed add is a
/// warning, not an error.
pub fn add_single_file(writer: &mut ArchiveWriter, path: &Path, archive_path: &str) -> bool {
    if !path.exists() {
        eprintln!("  [WARN] File does not exist: {}", path.display());
        return false;
    }
    match writer.add_file(path, archive_path) {
        Ok(()) => {
            println!("Added single file: {}", archive_path);
            true
        }
        Err(e) => {
            eprintln!("  [WARN] Failed to add file {}: {:#}", path.display(), e);
            false
        }
    }
}

/// Build, stamp and verify one archive.
///
/// The source directory is checked before anything on disk changes, so a
/// missing tree leaves any previous archive untouched and creates nothing.
pub fn build_archive(request: &BuildRequest, built_at: OffsetDateTime) -> Result<BuildOutcome> {
    check_source_dir(&request.source_dir)?;
    let started = Instant::now();

    let archive_path = &request.archive_path;
    if archive_path.exists() {
        println!("Removing existing archive file: {}", archive_path.display());
        remove_existing(archive_path)?;
    }

    let manifest = build_manifest(&request.source_dir, &request.prefix)?;
    let mut writer = ArchiveWriter::create(archive_path, request.compression_level)?;

    let report = populate(&mut writer, &manifest);
    println!("Added {} files from source directory", report.added);

    let metadata_file_added = match &request.metadata_file {
        Some(path) => add_single_file(&mut writer, path, &request.metadata_name),
        None => false,
    };

    writer.set_metadata(ArchiveMetadata::new(&request.git_hash, built_at));
    let written_entries = writer.entries();
    let written = writer.finish()?;

    let size_bytes = match fs::metadata(&written) {
        Ok(md) if md.is_file() && md.len() > 0 => md.len(),
        _ => bail!("archive file was not created: {}", written.display()),
    };
    let (sha256, _) = writer::sha256_file(&written)?;
    println!(
        "Successfully created {} ({} bytes)",
        written.display(),
        size_bytes
    );
    tracing::debug!(
        archive = %written.display(),
        entries = written_entries,
        sha256 = %sha256,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "archive verified"
    );

    Ok(BuildOutcome {
        archive_path: written,
        size_bytes,
        sha256,
        files_added: report.added,
        files_failed: report.failures.len(),
        metadata_file_added,
    })
}

fn remove_existing(path: &Path) -> Result<()> {
    if path.is_dir() {
        bail!("archive path is a directory: {}", path.display());
    }
    fs::remove_file(path)
        .with_context(|| format!("Failed to remove existing {}", path.display()))
}
