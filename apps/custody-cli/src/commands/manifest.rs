// manifest.rs — Manifest subcommands: tail, verify.

use clap::Subcommand;
use custody_audit::CustodyManifest;
use custody_pipeline::{verify_vault, PipelineConfig, VaultFinding};

#[derive(Subcommand)]
pub enum ManifestCommands {
    /// Show the most recent custody records.
    Tail {
        /// Number of records to show.
        #[arg(short, default_value = "10")]
        n: usize,
        /// Print records as JSON lines.
        #[arg(long)]
        json: bool,
    },
    /// Re-hash every vault copy and compare it with the manifest.
    Verify,
}

pub fn execute(cmd: &ManifestCommands, config: &PipelineConfig) -> anyhow::Result<()> {
    let path = &config.manifest;
    if !path.exists() {
        println!("No custody manifest found at {}", path.display());
        return Ok(());
    }

    match cmd {
        ManifestCommands::Tail { n, json } => {
            let records = CustodyManifest::read_all(path)?;
            let start = records.len().saturating_sub(*n);
            let recent = &records[start..];

            if recent.is_empty() {
                println!("No custody records.");
                return Ok(());
            }

            if *json {
                for record in recent {
                    println!("{}", serde_json::to_string(record)?);
                }
                return Ok(());
            }

            println!(
                "{:<20} {:<10} {:<30} {:>10}  SHA-256",
                "TIMESTAMP", "AGENT", "FILE", "BYTES"
            );
            println!("{}", "-".repeat(100));
            for record in recent {
                println!(
                    "{:<20} {:<10} {:<30} {:>10}  {}",
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.agent,
                    record.file_name,
                    record.size_bytes,
                    record.digest,
                );
            }
        }

        ManifestCommands::Verify => {
            let report = verify_vault(path, &config.vault_dir)?;
            for finding in report.problems() {
                match finding {
                    VaultFinding::Missing { file_name, path } => {
                        println!("MISSING  {} (expected at {})", file_name, path.display());
                    }
                    VaultFinding::Altered {
                        file_name,
                        recorded,
                        actual,
                    } => {
                        println!("ALTERED  {}", file_name);
                        println!("  recorded: {}", recorded);
                        println!("  actual:   {}", actual);
                    }
                    VaultFinding::Intact { .. } => {}
                }
            }

            if report.is_clean() {
                println!(
                    "Vault verified: {} record(s), every copy matches its recorded digest.",
                    report.intact()
                );
            } else {
                anyhow::bail!(
                    "vault verification failed: {} of {} record(s) missing or altered",
                    report.findings.len() - report.intact(),
                    report.findings.len()
                );
            }
        }
    }

    Ok(())
}
