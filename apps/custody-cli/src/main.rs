//! # custody
//!
//! Command-line interface for the Custody evidence intake pipeline.
//!
//! - `custody run` — watch the intake directory until Ctrl-C
//! - `custody scan` — process whatever is in the intake directory once
//! - `custody manifest tail/verify` — inspect the chain-of-custody manifest

mod commands;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use custody_pipeline::PipelineConfig;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "custody=info";

/// Custody — hash, record and vault incoming evidence files.
#[derive(Parser)]
#[command(name = "custody", version, about)]
struct Cli {
    /// Case root directory; the default layout lives under `data/`.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Config file (defaults to custody.toml in the root, if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory to watch for new evidence.
    #[arg(long)]
    watch_dir: Option<PathBuf>,

    /// Vault directory for verified copies.
    #[arg(long)]
    vault_dir: Option<PathBuf>,

    /// Path to the CSV custody manifest.
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Seconds between polls.
    #[arg(long)]
    interval: Option<u64>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline until interrupted.
    Run,
    /// Poll the watch directory once and exit.
    Scan,
    /// Inspect the chain-of-custody manifest.
    Manifest {
        #[command(subcommand)]
        command: commands::manifest::ManifestCommands,
    },
}

impl Cli {
    /// Config file (or defaults) for the root, with command-line overrides applied.
    fn pipeline_config(&self, root: &Path) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::discover(root, self.config.as_deref())?;
        if let Some(dir) = &self.watch_dir {
            config.watch_dir = dir.clone();
        }
        if let Some(dir) = &self.vault_dir {
            config.vault_dir = dir.clone();
        }
        if let Some(path) = &self.manifest {
            config.manifest = path.clone();
        }
        if let Some(secs) = self.interval {
            config.poll_interval_secs = secs;
        }
        Ok(config)
    }
}

fn init_logging(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let root = cli.root.canonicalize().unwrap_or_else(|_| cli.root.clone());
    let config = cli.pipeline_config(&root)?;

    match &cli.command {
        Commands::Run => commands::run::execute(config),
        Commands::Scan => commands::run::scan(config),
        Commands::Manifest { command } => commands::manifest::execute(command, &config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "custody",
            "--root",
            "/case",
            "--watch-dir",
            "/mnt/dropbox",
            "--interval",
            "2",
            "scan",
        ]);
        let config = cli.pipeline_config(Path::new("/case")).unwrap();
        assert_eq!(config.watch_dir, PathBuf::from("/mnt/dropbox"));
        assert_eq!(config.vault_dir, PathBuf::from("/case/data/vault"));
        assert_eq!(config.poll_interval_secs, 2);
    }

    #[test]
    fn manifest_tail_parses_count() {
        let cli = Cli::parse_from(["custody", "manifest", "tail", "-n", "5", "--json"]);
        assert!(matches!(cli.command, Commands::Manifest { .. }));
    }
}
