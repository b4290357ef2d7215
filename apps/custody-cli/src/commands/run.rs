// run.rs — `custody run` and `custody scan`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use custody_pipeline::{Pipeline, PipelineConfig, RunSummary};

/// Build the pipeline and poll until Ctrl-C.
pub fn execute(config: PipelineConfig) -> anyhow::Result<()> {
    let pipeline = Pipeline::build(config).context("failed to start custody pipeline")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        tracing::info!("received Ctrl-C, finishing current batch");
        flag.store(true, Ordering::SeqCst);
    })
    .context("failed to install Ctrl-C handler")?;

    let config = pipeline.config();
    println!("{}", "=".repeat(60));
    println!("  CUSTODY PIPELINE ACTIVE (run {})", pipeline.run_id());
    println!("  WATCH:    {}", config.watch_dir.display());
    println!("  VAULT:    {}", config.vault_dir.display());
    println!("  MANIFEST: {}", config.manifest.display());
    println!("{}", "=".repeat(60));

    let summary = pipeline.run(&shutdown);
    print_summary(&summary);
    Ok(())
}

/// Build the pipeline, poll once, and report.
///
/// Exits with an error if any item failed a stage, so batch callers notice.
pub fn scan(config: PipelineConfig) -> anyhow::Result<()> {
    let pipeline = Pipeline::build(config).context("failed to start custody pipeline")?;
    let found = pipeline.poll_once();
    let summary = pipeline.summary();

    println!("{} new file(s) found.", found);
    print_summary(&summary);

    let failures = summary.verify_failures
        + summary.record_failures
        + summary.archive_failures
        + summary.conflicts;
    if failures > 0 {
        anyhow::bail!("{} stage failure(s); see log for details", failures);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "verified {} (failed {}), recorded {} (failed {}), vaulted {} (failed {}, conflicts {})",
        summary.verified,
        summary.verify_failures,
        summary.recorded,
        summary.record_failures,
        summary.archived,
        summary.archive_failures,
        summary.conflicts,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scan_of_clean_batch_succeeds() {
        let root = tempdir().unwrap();
        let config = PipelineConfig::for_root(root.path());
        fs::create_dir_all(&config.watch_dir).unwrap();
        fs::write(config.watch_dir.join("evidence.txt"), "content").unwrap();
        let vault = config.vault_dir.clone();

        scan(config).unwrap();
        assert!(vault.join("evidence.txt").is_file());
    }

    #[test]
    fn scan_reports_vault_conflict_as_failure() {
        let root = tempdir().unwrap();
        let config = PipelineConfig::for_root(root.path());
        fs::create_dir_all(&config.watch_dir).unwrap();
        fs::create_dir_all(&config.vault_dir).unwrap();
        fs::write(config.vault_dir.join("clash.txt"), "original").unwrap();
        fs::write(config.watch_dir.join("clash.txt"), "impostor").unwrap();
        let vault = config.vault_dir.clone();

        assert!(scan(config).is_err());
        assert_eq!(fs::read_to_string(vault.join("clash.txt")).unwrap(), "original");
    }
}
