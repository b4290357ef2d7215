// error.rs — Error types for the pipeline stages and startup.
//
// Stage errors (everything except config and directory creation) never leave
// a handler: each handler logs them with the file name and stage attached.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building or running the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required directory could not be created at startup.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML for `PipelineConfig`.
    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// The config parsed but describes an unusable layout.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The manifest or a digest computation failed.
    #[error("audit error: {0}")]
    Audit(#[from] custody_audit::AuditError),

    /// A file I/O operation failed during a stage.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A discovered path is no longer a regular file.
    #[error("{path} is not a regular file")]
    NotAFile { path: PathBuf },

    /// The vault copy was not present after the copy returned.
    #[error("vault copy {path} does not exist after copy")]
    CopyMissing { path: PathBuf },

    /// The vault copy's digest differs from the verified digest.
    #[error("digest mismatch for {path}: expected {expected}, got {actual}")]
    DigestMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// A different file with the same name is already in the vault.
    #[error(
        "custody conflict: vault already holds '{file_name}' with digest {existing}, refusing to replace it with {incoming}"
    )]
    CollisionConflict {
        file_name: String,
        existing: String,
        incoming: String,
    },
}
