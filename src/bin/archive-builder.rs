use anyhow::{bail, Context, Result};
use release_packager::archive::{build_archive, BuildRequest};
use release_packager::preflight::{check_archive_writable, check_source_dir};
use release_packager::{load_archive_config, logging, timestamp};

fn usage() -> &'static str {
    "Usage: archive-builder <archive_name> <git_hash>"
}

fn main() -> Result<()> {
    logging::init();
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [archive_name, git_hash] => run(archive_name, git_hash),
        _ => bail!(usage()),
    }
}

fn run(archive_name: &str, git_hash: &str) -> Result<()> {
    if archive_name.is_empty() || archive_name.contains(['/', '\\']) {
        bail!("invalid archive name '{archive_name}': expected a bare file name");
    }

    let cwd = std::env::current_dir().context("resolving current directory")?;
    let config = load_archive_config(&cwd)?;
    let archive_path = config.archive_path(archive_name);

    println!("Archive file path: {}", archive_path.display());
    println!("Metadata file path: {}", config.metadata_file.display());
    println!("Source directory: {}", config.source_dir.display());

    check_archive_writable(&config.output_dir)?;
    check_source_dir(&config.source_dir)?;

    let request = BuildRequest {
        archive_path,
        source_dir: config.source_dir,
        metadata_file: Some(config.metadata_file),
        metadata_name: config.metadata_name,
        prefix: config.prefix,
        git_hash: git_hash.to_string(),
        compression_level: config.compression_level,
    };
    let outcome = build_archive(&request, timestamp::now()).with_context(|| {
        format!("Failed to create {}", request.archive_path.display())
    })?;

    if outcome.files_failed > 0 {
        eprintln!(
            "  [WARN] {} file(s) could not be added; archive is incomplete",
            outcome.files_failed
        );
    }
    println!("sha256: {}", outcome.sha256);
    Ok(())
}
