//! Source-tree enumeration for archive population.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// One file to package: where it lives and where it lands in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub source: PathBuf,
    pub archive_path: String,
}

/// Ordered list of files to package, sorted by archive path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManifestEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ManifestEntry;
    type IntoIter = std::slice::Iter<'a, ManifestEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Enumerate every regular file under `source_dir`.
///
/// Directories are not entries of their own. Anything whose name starts with
/// `.` is skipped, including everything below a dot directory. Symlinks are
/// followed, so a link to a file is packaged as that file's contents.
/// Entries the walk cannot read are reported and skipped.
pub fn build_manifest(source_dir: &Path, prefix: &str) -> Result<Manifest> {
    let mut entries = Vec::new();

    let walker = WalkDir::new(source_dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|ent| ent.depth() == 0 || !is_hidden(ent));

    for ent in walker {
        let ent = match ent {
            Ok(ent) => ent,
            Err(err) => {
                eprintln!("  [WARN] Skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !ent.file_type().is_file() {
            continue;
        }

        let rel = ent.path().strip_prefix(source_dir).with_context(|| {
            format!(
                "entry '{}' outside source directory '{}'",
                ent.path().display(),
                source_dir.display()
            )
        })?;
        entries.push(ManifestEntry {
            source: ent.path().to_path_buf(),
            archive_path: archive_path_for(prefix, rel),
        });
    }

    entries.sort_by(|a, b| a.archive_path.cmp(&b.archive_path));
    tracing::debug!(
        source_dir = %source_dir.display(),
        files = entries.len(),
        "built archive manifest"
    );
    Ok(Manifest { entries })
}

/// `prefix` + `rel` with every separator turned into `/`.
pub fn archive_path_for(prefix: &str, rel: &Path) -> String {
    format!("{}{}", prefix, rel.to_string_lossy().replace('\\', "/"))
}

fn is_hidden(ent: &DirEntry) -> bool {
    ent.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn archive_paths(manifest: &Manifest) -> Vec<&str> {
        manifest.iter().map(|e| e.archive_path.as_str()).collect()
    }

    #[test]
    fn test_one_entry_per_regular_file() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("a/b")).unwrap();
        fs::create_dir_all(src.join("empty")).unwrap();
        fs::write(src.join("root.php"), b"r").unwrap();
        fs::write(src.join("a/one.php"), b"1").unwrap();
        fs::write(src.join("a/b/two.php"), b"2").unwrap();

        let manifest = build_manifest(&src, "src/").unwrap();
        assert_eq!(
            archive_paths(&manifest),
            vec!["src/a/b/two.php", "src/a/one.php", "src/root.php"]
        );
        assert_eq!(manifest.entries()[2].source, src.join("root.php"));
    }

    #[test]
    fn test_dot_entries_skipped() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join(".git/objects")).unwrap();
        fs::create_dir_all(src.join("lib")).unwrap();
        fs::write(src.join(".git/objects/blob"), b"x").unwrap();
        fs::write(src.join(".env"), b"secret").unwrap();
        fs::write(src.join("lib/.keep"), b"").unwrap();
        fs::write(src.join("lib/code.php"), b"c").unwrap();

        let manifest = build_manifest(&src, "").unwrap();
        assert_eq!(archive_paths(&manifest), vec!["lib/code.php"]);
    }

    #[test]
    fn test_hidden_root_still_walked() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join(".staging");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("file.txt"), b"f").unwrap();

        let manifest = build_manifest(&src, "src/").unwrap();
        assert_eq!(archive_paths(&manifest), vec!["src/file.txt"]);
    }

    #[test]
    fn test_empty_tree() {
        let temp = TempDir::new().unwrap();
        let manifest = build_manifest(temp.path(), "src/").unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.len(), 0);
    }

    #[test]
    fn test_archive_path_uses_forward_slashes() {
        let rel = Path::new("dir").join("sub").join("file.txt");
        assert_eq!(archive_path_for("src/", &rel), "src/dir/sub/file.txt");
        assert_eq!(
            archive_path_for("src/", Path::new("win\\style\\path.txt")),
            "src/win/style/path.txt"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_followed() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let outside = temp.path().join("outside.txt");
        fs::write(&outside, b"o").unwrap();
        std::os::unix::fs::symlink(&outside, src.join("link.txt")).unwrap();

        let manifest = build_manifest(&src, "src/").unwrap();
        assert_eq!(archive_paths(&manifest), vec!["src/link.txt"]);
    }
}
