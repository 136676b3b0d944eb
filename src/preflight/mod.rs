//! Preflight checks run before any archive file is touched.
//!
//! A failed check leaves the output directory exactly as it was: no stale
//! archive is removed and no new one is created.
//!
//! # Example
//!
//! ```rust,no_run
//! use release_packager::preflight::{check_archive_writable, check_source_dir};
//! use std::path::Path;
//!
//! if let Err(e) = check_archive_writable(Path::new(".")) {
//!     eprintln!("{}", e);
//! }
//! check_source_dir(Path::new("src")).unwrap();
//! ```

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// Host switch that turns archive creation off, e.g. on shared CI runners
/// that must never produce release bundles.
pub const READONLY_ENV: &str = "ARCHIVE_BUILDER_READONLY";

/// Whether a value of [`READONLY_ENV`] disables archive writing.
pub fn readonly_requested(value: Option<&str>) -> bool {
    match value {
        Some(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        None => false,
    }
}

/// Check that the host allows writing an archive into `output_dir`.
///
/// Fails when [`READONLY_ENV`] is set, or when `output_dir` exists but is
/// read-only. A missing `output_dir` is fine; it is created on build.
pub fn check_archive_writable(output_dir: &Path) -> Result<()> {
    let env_value = std::env::var(READONLY_ENV).ok();
    if readonly_requested(env_value.as_deref()) {
        bail!(
            "archive creation is disabled. Unset {} to allow writing archives",
            READONLY_ENV
        );
    }

    if output_dir.exists() {
        let metadata = fs::metadata(output_dir).with_context(|| {
            format!("reading output directory '{}'", output_dir.display())
        })?;
        if !metadata.is_dir() {
            bail!(
                "output path is not a directory: {}",
                output_dir.display()
            );
        }
        if metadata.permissions().readonly() {
            bail!(
                "archive creation is disabled: output directory is read-only: {}",
                output_dir.display()
            );
        }
    }

    Ok(())
}

/// Check that the source tree exists and is a directory.
pub fn check_source_dir(source_dir: &Path) -> Result<()> {
    if !source_dir.is_dir() {
        bail!("source directory does not exist: {}", source_dir.display());
    }
    Ok(())
}
