// record.rs — One row of the chain-of-custody manifest.
//
// Records are written once and never touched again. The column names are
// part of the on-disk format; the aliases let older manifests that used
// underscore-separated headers be read back.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Digest algorithm recorded alongside each hash.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "SHA-256")]
    Sha256,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha256 => write!(f, "SHA-256"),
        }
    }
}

/// A single chain-of-custody entry: one line in the CSV manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// When the record was written (UTC, RFC 3339 on disk).
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,

    /// Which pipeline agent wrote the record.
    #[serde(rename = "ProcessingAgent", alias = "Processing_Agent")]
    pub agent: String,

    /// Base name of the source file. This is the item's identity.
    #[serde(rename = "FileName", alias = "File_Name")]
    pub file_name: String,

    /// Lowercase hex digest of the file content.
    #[serde(rename = "SHA256_Hash")]
    pub digest: String,

    #[serde(rename = "HashType", alias = "Hash_Type")]
    pub algorithm: HashAlgorithm,

    #[serde(rename = "FileSizeBytes", alias = "File_Size_Bytes")]
    pub size_bytes: u64,

    /// Path the file was picked up from.
    #[serde(rename = "FullPath", alias = "Full_Path")]
    pub full_path: String,
}

impl Record {
    /// Create a record stamped with the current time.
    ///
    /// `file_name` is derived from the last component of `path`; a path with
    /// no file name (e.g. `/`) records its full display form instead.
    pub fn new(
        agent: impl Into<String>,
        path: impl AsRef<Path>,
        digest: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        let path = path.as_ref();
        let full_path = path.display().to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| full_path.clone());
        Self {
            timestamp: Utc::now(),
            agent: agent.into(),
            file_name,
            digest: digest.into(),
            algorithm: HashAlgorithm::Sha256,
            size_bytes,
            full_path,
        }
    }
}
