//! Release packaging tooling.
//!
//! Two independent utilities invoked by CI, each backed by a module here:
//!
//! - **Archive bundles** ([`archive`]) - package a source tree, an optional
//!   metadata file and a `{git_hash, build_date}` stamp into one
//!   `.tar.zst` bundle
//! - **Build info** ([`build_info`]) - emit the JSON descriptor of a CI
//!   build with its release, source and log URLs
//!
//! # Architecture
//!
//! ```text
//! archive-builder ──────┐
//!     │                 ├── config     (archive-builder.toml + defaults)
//!     │                 ├── preflight  (writable host, source tree present)
//!     └── archive ──────┤
//!                       ├── manifest   (walk, skip dot entries, prefix)
//!                       ├── writer     (tar + zstd, metadata stamp)
//!                       └── timestamp
//!
//! build-info-emitter ── build_info ── timestamp
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use release_packager::archive::{build_archive, BuildRequest};
//! use release_packager::timestamp;
//! use std::path::PathBuf;
//!
//! let request = BuildRequest {
//!     archive_path: PathBuf::from("bundle.tar.zst"),
//!     source_dir: PathBuf::from("src"),
//!     metadata_file: Some(PathBuf::from("virion.yml")),
//!     metadata_name: "virion.yml".into(),
//!     prefix: "src/".into(),
//!     git_hash: "abc123".into(),
//!     compression_level: 3,
//! };
//! let outcome = build_archive(&request, timestamp::now())?;
//! println!("{} bytes", outcome.size_bytes);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod archive;
pub mod build_info;
pub mod config;
pub mod logging;
pub mod preflight;
pub mod timestamp;

pub use archive::{build_archive, BuildOutcome, BuildRequest};
pub use build_info::BuildInfo;
pub use config::{load_archive_config, ArchiveConfig};
