// error.rs — Error types for the custody manifest and hashing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while hashing files or touching the manifest.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to open or create the manifest file.
    #[error("failed to open custody manifest at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write or sync a record.
    #[error("failed to append record: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// The manifest could not be encoded or parsed as CSV.
    #[error("manifest csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The manifest header has no file name column, so identities can't be recovered.
    #[error("manifest at {path} has no FileName column")]
    MissingColumn { path: PathBuf },

    /// Failed to read a file for hashing.
    #[error("failed to hash file at {path}: {source}")]
    HashFileFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The record writer was poisoned by a panic in another thread.
    #[error("manifest writer lock poisoned")]
    LockPoisoned,
}
