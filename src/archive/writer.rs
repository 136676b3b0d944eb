//! zstd-compressed tar writer for release bundles.
//!
//! Entries carry mtime 0 and uid/gid 0 so two builds of the same tree differ
//! only in the metadata stamp.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tar::Builder as TarBuilder;

use super::metadata::{ArchiveMetadata, METADATA_ENTRY};

type Encoder = zstd::stream::Encoder<'static, File>;

/// An archive being written. Nothing is usable on disk until [`finish`].
///
/// [`finish`]: ArchiveWriter::finish
pub struct ArchiveWriter {
    path: PathBuf,
    builder: TarBuilder<Encoder>,
    metadata: Option<ArchiveMetadata>,
    entries: usize,
}

impl ArchiveWriter {
    /// Create (truncating) the archive file at `path`.
    pub fn create(path: &Path, compression_level: i32) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("creating output directory '{}'", parent.display())
                })?;
            }
        }
        let out =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let encoder = zstd::stream::Encoder::new(out, compression_level)
            .with_context(|| format!("starting zstd stream for {}", path.display()))?;
        let builder = TarBuilder::new(encoder);

        Ok(Self {
            path: path.to_path_buf(),
            builder,
            metadata: None,
            entries: 0,
        })
    }

    /// Number of file entries appended so far, not counting metadata.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Append the regular file `source` as `archive_path`.
    ///
    /// The whole file is read before its header is written, so the header
    /// size always matches the data and a failed read leaves the stream
    /// untouched. Files whose stat size is wrong (procfs, files still being
    /// written) are packaged with what was actually read.
    pub fn add_file(&mut self, source: &Path, archive_path: &str) -> Result<()> {
        let mut file = File::open(source)
            .with_context(|| format!("Failed to open {}", source.display()))?;
        let md = file
            .metadata()
            .with_context(|| format!("Failed to stat {}", source.display()))?;
        if !md.is_file() {
            bail!("not a regular file: {}", source.display());
        }

        let mut bytes = Vec::with_capacity(md.len() as usize);
        file.read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read {}", source.display()))?;

        let mut header = regular_header(bytes.len() as u64, file_mode(&md));
        self.builder
            .append_data(&mut header, archive_path, bytes.as_slice())
            .with_context(|| format!("Failed to append {archive_path}"))?;
        self.entries += 1;
        Ok(())
    }

    /// Record the build stamp. Only the last one set is written.
    pub fn set_metadata(&mut self, metadata: ArchiveMetadata) {
        self.metadata = Some(metadata);
    }

    /// Write the metadata entry, close the tar and zstd streams, and flush
    /// the file to disk.
    pub fn finish(self) -> Result<PathBuf> {
        let Self {
            path,
            mut builder,
            metadata,
            ..
        } = self;

        if let Some(metadata) = metadata {
            let payload = metadata.to_json_bytes()?;
            let mut header = regular_header(payload.len() as u64, 0o644);
            builder
                .append_data(&mut header, METADATA_ENTRY, payload.as_slice())
                .with_context(|| format!("Failed to append {METADATA_ENTRY}"))?;
        }

        let encoder = builder
            .into_inner()
            .with_context(|| "Failed to finalize tar builder")?;
        let file = encoder
            .finish()
            .with_context(|| format!("Failed to finish zstd stream for {}", path.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync {}", path.display()))?;
        Ok(path)
    }
}

fn regular_header(size: u64, mode: u32) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(size);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mode(mode);
    header.set_cksum();
    header
}

#[cfg(unix)]
fn file_mode(md: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    md.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_md: &fs::Metadata) -> u32 {
    0o644
}

type Decoder = zstd::stream::Decoder<'static, BufReader<File>>;

fn open_archive(path: &Path) -> Result<tar::Archive<Decoder>> {
    let f = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let decoder = zstd::stream::Decoder::new(f)
        .with_context(|| format!("Failed to start zstd decoder for {}", path.display()))?;
    Ok(tar::Archive::new(decoder))
}

/// Entry paths of a finished archive, in stored order.
pub fn list_entries(path: &Path) -> Result<Vec<String>> {
    let mut archive = open_archive(path)?;
    let mut names = Vec::new();
    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read {}", path.display()))?
    {
        let entry = entry.with_context(|| format!("Corrupt entry in {}", path.display()))?;
        let entry_path = entry.path()?;
        names.push(entry_path.to_string_lossy().replace('\\', "/"));
    }
    Ok(names)
}

/// Contents of one entry of a finished archive, if present.
pub fn read_entry(path: &Path, archive_path: &str) -> Result<Option<Vec<u8>>> {
    let mut archive = open_archive(path)?;
    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read {}", path.display()))?
    {
        let mut entry = entry.with_context(|| format!("Corrupt entry in {}", path.display()))?;
        if entry.path()?.to_string_lossy() != archive_path {
            continue;
        }
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read {archive_path} from {}", path.display()))?;
        return Ok(Some(bytes));
    }
    Ok(None)
}

/// Build stamp of a finished archive.
pub fn read_metadata(path: &Path) -> Result<ArchiveMetadata> {
    let bytes = read_entry(path, METADATA_ENTRY)?.with_context(|| {
        format!("No {} entry in {}", METADATA_ENTRY, path.display())
    })?;
    ArchiveMetadata::from_json_bytes(&bytes)
}

pub(crate) fn sha256_file(path: &Path) -> Result<(String, u64)> {
    let f = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut r = BufReader::new(f);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = r.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    let sha = format!("{:x}", hasher.finalize());
    Ok((sha, size))
}
