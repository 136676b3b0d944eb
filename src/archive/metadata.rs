use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::timestamp;

/// Archive entry holding the build stamp. The leading dot keeps it out of
/// reach of any manifest entry, since dot entries are never packaged.
pub const METADATA_ENTRY: &str = ".build-metadata.json";

/// Build stamp attached once when an archive is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    pub git_hash: String,
    pub build_date: String,
}

impl ArchiveMetadata {
    pub fn new(git_hash: &str, built_at: OffsetDateTime) -> Self {
        Self {
            git_hash: git_hash.to_string(),
            build_date: timestamp::build_date(built_at),
        }
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).context("serializing archive metadata")
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("parsing archive metadata")
    }
}
