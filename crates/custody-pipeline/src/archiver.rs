// archiver.rs — Copies verified evidence into the vault.
//
// A copy only counts once it has been read back: the destination must exist
// after the copy and, unless disabled, hash to the digest the verifier
// captured. Source access and modification times are carried over.
//
// The vault entry is named after the discovered path, not its canonical
// target, so a symlink in the watch directory is vaulted under the same name
// the manifest records for it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use custody_audit::hasher;
use custody_events::{Handler, VerifiedItem};
use filetime::FileTime;
use tracing::Span;

use crate::agent::{lock, Activity};
use crate::config::CollisionPolicy;
use crate::error::PipelineError;

pub const AGENT_NAME: &str = "Archiver";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiverState {
    pub activity: Activity,
    pub archived: u64,
    pub failed: u64,
    /// Items refused because the vault held a different file of the same name.
    pub conflicts: u64,
}

pub struct Archiver {
    vault_root: PathBuf,
    collision: CollisionPolicy,
    verify_copies: bool,
    state: Mutex<ArchiverState>,
    span: Span,
}

impl Archiver {
    /// Archive into `vault_dir`, which must already exist.
    pub fn new(vault_dir: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let vault_dir = vault_dir.as_ref();
        let vault_root = vault_dir.canonicalize().map_err(|source| PipelineError::Io {
            path: vault_dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            vault_root,
            collision: CollisionPolicy::default(),
            verify_copies: true,
            state: Mutex::new(ArchiverState::default()),
            span: tracing::info_span!("agent", agent = AGENT_NAME),
        })
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision = policy;
        self
    }

    /// Turn the post-copy digest check on or off. Existence is always checked.
    pub fn with_copy_verification(mut self, enabled: bool) -> Self {
        self.verify_copies = enabled;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn state(&self) -> ArchiverState {
        lock(&self.state).clone()
    }

    /// Copy `item` into the vault and confirm it landed. Returns the vault path.
    pub fn archive(&self, item: &VerifiedItem) -> Result<PathBuf, PipelineError> {
        let file_name = item.path.file_name().ok_or_else(|| PipelineError::NotAFile {
            path: item.path.clone(),
        })?;
        let source = item.path.canonicalize().map_err(|source| PipelineError::Io {
            path: item.path.clone(),
            source,
        })?;
        let destination = self.vault_root.join(file_name);
        if destination == source {
            // Copying a file onto itself would truncate it.
            return Err(PipelineError::InvalidConfig(format!(
                "{} is already inside the vault",
                source.display()
            )));
        }

        if destination.exists() {
            self.check_collision(&destination, item)?;
        }

        fs::copy(&source, &destination).map_err(|e| PipelineError::Io {
            path: destination.clone(),
            source: e,
        })?;
        preserve_times(&source, &destination);

        if !destination.exists() {
            return Err(PipelineError::CopyMissing { path: destination });
        }
        if self.verify_copies {
            let actual = hasher::hash_file(&destination)?;
            if actual != item.digest {
                return Err(PipelineError::DigestMismatch {
                    path: destination,
                    expected: item.digest.clone(),
                    actual,
                });
            }
        }
        Ok(destination)
    }

    fn check_collision(&self, destination: &Path, item: &VerifiedItem) -> Result<(), PipelineError> {
        let existing = hasher::hash_file(destination)?;
        if existing == item.digest {
            tracing::debug!(path = %destination.display(), "identical copy already in vault, refreshing");
            return Ok(());
        }
        match self.collision {
            CollisionPolicy::Reject => Err(PipelineError::CollisionConflict {
                file_name: item.file_name(),
                existing,
                incoming: item.digest.clone(),
            }),
            CollisionPolicy::Overwrite => {
                tracing::warn!(
                    path = %destination.display(),
                    existing = %existing,
                    incoming = %item.digest,
                    "overwriting different vault entry with the same name"
                );
                Ok(())
            }
        }
    }
}

/// Best-effort copy of access and modification times.
fn preserve_times(source: &Path, destination: &Path) {
    let result = fs::metadata(source).and_then(|meta| {
        filetime::set_file_times(
            destination,
            FileTime::from_last_access_time(&meta),
            FileTime::from_last_modification_time(&meta),
        )
    });
    if let Err(e) = result {
        tracing::warn!(path = %destination.display(), error = %e, "could not preserve timestamps");
    }
}

impl Handler<VerifiedItem> for Archiver {
    fn handle(&self, item: &VerifiedItem) {
        let _entered = self.span.enter();
        let name = item.file_name();
        lock(&self.state).activity = Activity::Archiving(name.clone());

        match self.archive(item) {
            Ok(destination) => {
                let mut state = lock(&self.state);
                state.archived += 1;
                state.activity = Activity::Idle;
                tracing::info!(file = %name, vault = %destination.display(), "verified copy in vault");
            }
            Err(e) => {
                let mut state = lock(&self.state);
                if matches!(e, PipelineError::CollisionConflict { .. }) {
                    state.conflicts += 1;
                } else {
                    state.failed += 1;
                }
                state.activity = Activity::ErrorRecovery;
                tracing::error!(file = %name, stage = "archive", error = %e, "vaulting failed");
            }
        }
    }
}
