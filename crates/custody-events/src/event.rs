// event.rs — Event kinds and their payloads.
//
// Payloads are plain values. The bus hands every subscriber a shared
// reference to the same value, so nothing downstream can mutate what another
// stage sees.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The pipeline's event kinds. Each kind carries exactly one payload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A file was seen in the watch directory for the first time.
    Discovered,
    /// A discovered file was read and hashed successfully.
    Verified,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Discovered => "discovered",
            EventKind::Verified => "verified",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A newly sighted file in the watch directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredItem {
    pub path: PathBuf,
    pub discovered_at: DateTime<Utc>,
}

impl DiscoveredItem {
    /// Stamp a path as discovered now.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            discovered_at: Utc::now(),
        }
    }

    /// The item's identity: the base name of its path.
    pub fn file_name(&self) -> String {
        base_name(&self.path)
    }
}

/// A file whose content digest has been captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedItem {
    pub path: PathBuf,
    /// SHA-256 of the content, 64 lowercase hex characters.
    pub digest: String,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

impl VerifiedItem {
    pub fn file_name(&self) -> String {
        base_name(&self.path)
    }
}

/// Base name of a path, or the whole path when it has none.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
