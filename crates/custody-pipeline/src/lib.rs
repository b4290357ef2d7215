//! # custody-pipeline
//!
//! Watches a directory for new evidence, captures a SHA-256 digest of each
//! file, records it in the chain-of-custody manifest and copies it into the
//! vault.
//!
//! ## Flow
//!
//! 1. [`Watcher::poll`](Discoverer::poll) finds files it hasn't seen → `discovered`
//! 2. [`Verifier`] hashes each one → `verified` (nothing on failure)
//! 3. [`Recorder`] appends a manifest row for each verified item
//! 4. [`Archiver`] copies it into the vault and checks the copy
//!
//! [`Pipeline`] builds and wires all four and drives the poll loop.
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//! use custody_pipeline::{Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::build(PipelineConfig::for_root("/cases/2024-117")).unwrap();
//! let stop = AtomicBool::new(false);
//! pipeline.run(&stop);
//! ```

pub mod agent;
pub mod archiver;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod reconcile;
pub mod recorder;
pub mod verifier;
pub mod watcher;

pub use agent::{Activity, Discoverer};
pub use archiver::{Archiver, ArchiverState};
pub use config::{CollisionPolicy, PipelineConfig, CONFIG_FILE_NAME};
pub use error::PipelineError;
pub use pipeline::{Pipeline, RunSummary};
pub use reconcile::{verify_vault, VaultFinding, VaultReport};
pub use recorder::{Recorder, RecorderState};
pub use verifier::{Verifier, VerifierState};
pub use watcher::{Watcher, WatcherState};
