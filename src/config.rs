//! Implicit configuration for the archive builder.
//!
//! The builder's CLI only takes the archive base name and the commit hash.
//! Everything else comes from an optional `archive-builder.toml` next to the
//! working directory, falling back to the built-in layout.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "archive-builder.toml";
pub const ARCHIVE_EXTENSION: &str = "tar.zst";

pub const DEFAULT_SOURCE_DIR: &str = "src";
pub const DEFAULT_METADATA_FILE: &str = "virion.yml";
pub const DEFAULT_PREFIX: &str = "src/";
pub const DEFAULT_METADATA_NAME: &str = "virion.yml";
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Resolved archive-builder settings, all paths absolute or repo-relative
/// already joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveConfig {
    /// Tree whose regular files are packaged.
    pub source_dir: PathBuf,
    /// Optional extra file appended at `metadata_name`.
    pub metadata_file: PathBuf,
    /// Archive-relative prefix for every source file, `""` or ending in `/`.
    pub prefix: String,
    /// Archive-relative name of the extra metadata file.
    pub metadata_name: String,
    /// Directory the archive is written into.
    pub output_dir: PathBuf,
    pub compression_level: i32,
}

impl ArchiveConfig {
    /// Built-in layout rooted at `repo_root`.
    pub fn defaults(repo_root: &Path) -> Self {
        Self {
            source_dir: repo_root.join(DEFAULT_SOURCE_DIR),
            metadata_file: repo_root.join(DEFAULT_METADATA_FILE),
            prefix: DEFAULT_PREFIX.to_string(),
            metadata_name: DEFAULT_METADATA_NAME.to_string(),
            output_dir: repo_root.to_path_buf(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Output path for an archive called `base_name`.
    pub fn archive_path(&self, base_name: &str) -> PathBuf {
        self.output_dir.join(format!("{base_name}.{ARCHIVE_EXTENSION}"))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArchiveBuilderToml {
    #[serde(default)]
    archive: ArchiveToml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArchiveToml {
    source_dir: Option<String>,
    metadata_file: Option<String>,
    prefix: Option<String>,
    metadata_name: Option<String>,
    output_dir: Option<String>,
    compression_level: Option<i32>,
}

/// Load `archive-builder.toml` from `repo_root`, or the defaults when the
/// file does not exist.
pub fn load_archive_config(repo_root: &Path) -> Result<ArchiveConfig> {
    let config_path = repo_root.join(CONFIG_FILENAME);
    if !config_path.is_file() {
        tracing::debug!(path = %config_path.display(), "no config file, using defaults");
        return Ok(ArchiveConfig::defaults(repo_root));
    }

    let config_text = fs::read_to_string(&config_path)
        .with_context(|| format!("reading archive config '{}'", config_path.display()))?;
    parse_archive_config(repo_root, &config_path, &config_text)
}

fn parse_archive_config(
    repo_root: &Path,
    config_path: &Path,
    config_text: &str,
) -> Result<ArchiveConfig> {
    let parsed: ArchiveBuilderToml = toml::from_str(config_text)
        .with_context(|| format!("parsing archive config '{}'", config_path.display()))?;
    let archive = parsed.archive;
    let mut config = ArchiveConfig::defaults(repo_root);

    if let Some(source_dir) = archive.source_dir {
        if source_dir.trim().is_empty() {
            bail!(
                "invalid archive config '{}': source_dir must not be empty",
                config_path.display()
            );
        }
        config.source_dir = resolve_repo_path(repo_root, &source_dir);
    }
    if let Some(metadata_file) = archive.metadata_file {
        config.metadata_file = resolve_repo_path(repo_root, &metadata_file);
    }
    if let Some(output_dir) = archive.output_dir {
        config.output_dir = resolve_repo_path(repo_root, &output_dir);
    }
    if let Some(prefix) = archive.prefix {
        config.prefix = normalize_prefix(&prefix);
    }
    if let Some(metadata_name) = archive.metadata_name {
        validate_archive_name(&metadata_name).with_context(|| {
            format!(
                "invalid archive config '{}': metadata_name",
                config_path.display()
            )
        })?;
        config.metadata_name = metadata_name.replace('\\', "/");
    }
    if let Some(level) = archive.compression_level {
        if !(1..=22).contains(&level) {
            bail!(
                "invalid archive config '{}': compression_level {} out of range 1..=22",
                config_path.display(),
                level
            );
        }
        config.compression_level = level;
    }

    Ok(config)
}

pub(crate) fn resolve_repo_path(repo_root: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        repo_root.join(candidate)
    }
}

/// Forward slashes, no leading `/`, trailing `/` unless empty.
pub fn normalize_prefix(prefix: &str) -> String {
    let cleaned = prefix.trim().replace('\\', "/");
    let cleaned = cleaned.trim_matches('/');
    if cleaned.is_empty() {
        String::new()
    } else {
        format!("{cleaned}/")
    }
}

fn validate_archive_name(name: &str) -> Result<()> {
    let name = name.replace('\\', "/");
    if name.trim().is_empty() {
        bail!("archive entry name must not be empty");
    }
    if name.starts_with('/') {
        bail!("archive entry name must be relative: {name}");
    }
    if name.split('/').any(|part| part == "..") {
        bail!("archive entry name must not contain '..': {name}");
    }
    Ok(())
}
