// config.rs — Pipeline configuration.
//
// PipelineConfig says where evidence comes from, where the vault and the
// manifest live, and how often to poll. `for_root()` lays out the standard
// `data/` tree under a project root; a `custody.toml` at that root overrides
// any field. Relative paths in the file are resolved against the root.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Name of the optional config file at the project root.
pub const CONFIG_FILE_NAME: &str = "custody.toml";

/// What the archiver does when the vault already holds a different file
/// under the same name.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Leave the existing vault entry alone and log a custody conflict.
    #[default]
    Reject,
    /// Replace the existing vault entry (last write wins).
    Overwrite,
}

/// Configuration for one pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory scanned (non-recursively) for new evidence.
    pub watch_dir: PathBuf,

    /// Write-once archive directory.
    pub vault_dir: PathBuf,

    /// Path to the CSV chain-of-custody manifest.
    pub manifest: PathBuf,

    /// Seconds between polls of the watch directory.
    pub poll_interval_secs: u64,

    pub collision: CollisionPolicy,

    /// Re-hash each vault copy after writing it.
    pub verify_copies: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            watch_dir: PathBuf::from("data/input"),
            vault_dir: PathBuf::from("data/vault"),
            manifest: PathBuf::from("data/output/forensic_manifest.csv"),
            poll_interval_secs: 10,
            collision: CollisionPolicy::default(),
            verify_copies: true,
        }
    }
}

impl PipelineConfig {
    /// Create a config with the standard `data/` layout for a project root.
    pub fn for_root(root: impl AsRef<Path>) -> Self {
        Self::default().rooted_at(root)
    }

    /// Parse a TOML config file. Paths are returned as written.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| PipelineError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the config for a project root.
    ///
    /// An explicit `config_path` must exist. Without one, `custody.toml` at
    /// the root is used when present, otherwise the defaults.
    pub fn discover(
        root: impl AsRef<Path>,
        config_path: Option<&Path>,
    ) -> Result<Self, PipelineError> {
        let root = root.as_ref();
        let config = match config_path {
            Some(path) => Self::load(path)?,
            None => {
                let candidate = root.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    tracing::debug!(path = %candidate.display(), "loading config");
                    Self::load(&candidate)?
                } else {
                    Self::default()
                }
            }
        };
        Ok(config.rooted_at(root))
    }

    /// Join every relative path onto `root`.
    pub fn rooted_at(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        for path in [&mut self.watch_dir, &mut self.vault_dir, &mut self.manifest] {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// The same config with its paths in canonical form.
    ///
    /// The watch and vault directories and the manifest's directory must
    /// already exist. An existing manifest is resolved itself, so a symlinked
    /// manifest is judged by where it really lives.
    pub fn canonicalized(&self) -> Result<Self, PipelineError> {
        let canonical = |path: &Path| {
            path.canonicalize().map_err(|source| PipelineError::Io {
                path: path.to_path_buf(),
                source,
            })
        };

        let manifest = if self.manifest.exists() {
            canonical(self.manifest.as_path())?
        } else {
            let file_name = self.manifest.file_name().ok_or_else(|| {
                PipelineError::InvalidConfig(format!(
                    "manifest {} has no file name",
                    self.manifest.display()
                ))
            })?;
            canonical(manifest_dir(&self.manifest))?.join(file_name)
        };

        Ok(Self {
            watch_dir: canonical(self.watch_dir.as_path())?,
            vault_dir: canonical(self.vault_dir.as_path())?,
            manifest,
            ..self.clone()
        })
    }

    /// Reject layouts the pipeline can't run with.
    ///
    /// The vault and the manifest must stay out of the watch directory,
    /// otherwise the pipeline would pick up its own output as evidence.
    /// Paths are compared as written; run this on [`canonicalized`] to catch
    /// `..`, `./` or symlinked spellings of the same directory.
    ///
    /// [`canonicalized`]: PipelineConfig::canonicalized
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.poll_interval_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.vault_dir == self.watch_dir {
            return Err(PipelineError::InvalidConfig(format!(
                "vault_dir and watch_dir are the same directory ({})",
                self.watch_dir.display()
            )));
        }
        if self.manifest.parent() == Some(self.watch_dir.as_path()) {
            return Err(PipelineError::InvalidConfig(format!(
                "manifest {} is inside the watch directory",
                self.manifest.display()
            )));
        }
        Ok(())
    }
}

/// Directory holding the manifest; `.` for a bare file name.
pub(crate) fn manifest_dir(manifest: &Path) -> &Path {
    match manifest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
