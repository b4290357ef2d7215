// reconcile.rs — Check vault contents against the custody manifest.
//
// Every manifest row names a file and the digest it had when it was picked
// up. Reconciling re-hashes the vault copy of each and reports anything
// missing or altered.

use std::path::{Path, PathBuf};

use custody_audit::{hasher, AuditError, CustodyManifest};

use crate::error::PipelineError;

/// Outcome for one manifest row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultFinding {
    Intact { file_name: String },
    Missing { file_name: String, path: PathBuf },
    Altered {
        file_name: String,
        recorded: String,
        actual: String,
    },
}

impl VaultFinding {
    pub fn file_name(&self) -> &str {
        match self {
            VaultFinding::Intact { file_name }
            | VaultFinding::Missing { file_name, .. }
            | VaultFinding::Altered { file_name, .. } => file_name,
        }
    }

    pub fn is_intact(&self) -> bool {
        matches!(self, VaultFinding::Intact { .. })
    }
}

/// Findings in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultReport {
    pub findings: Vec<VaultFinding>,
}

impl VaultReport {
    pub fn is_clean(&self) -> bool {
        self.findings.iter().all(VaultFinding::is_intact)
    }

    pub fn intact(&self) -> usize {
        self.findings.iter().filter(|f| f.is_intact()).count()
    }

    pub fn problems(&self) -> impl Iterator<Item = &VaultFinding> {
        self.findings.iter().filter(|f| !f.is_intact())
    }
}

/// Re-hash the vault copy of every file named in the manifest.
pub fn verify_vault(
    manifest: impl AsRef<Path>,
    vault_dir: impl AsRef<Path>,
) -> Result<VaultReport, PipelineError> {
    let vault_dir = vault_dir.as_ref();
    let mut report = VaultReport::default();

    for record in CustodyManifest::read_all(manifest)? {
        let path = vault_dir.join(&record.file_name);
        let finding = match hasher::hash_file(&path) {
            Ok(actual) if actual == record.digest => VaultFinding::Intact {
                file_name: record.file_name,
            },
            Ok(actual) => VaultFinding::Altered {
                file_name: record.file_name,
                recorded: record.digest,
                actual,
            },
            Err(AuditError::HashFileFailed { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                VaultFinding::Missing {
                    file_name: record.file_name,
                    path,
                }
            }
            Err(e) => return Err(e.into()),
        };
        report.findings.push(finding);
    }

    Ok(report)
}
