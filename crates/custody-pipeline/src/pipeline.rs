// pipeline.rs — Wires the agents together and owns the poll loop.
//
// Subscriptions, in order:
//   discovered → Verifier
//   verified   → Recorder, Archiver
//
// Recording runs before archiving for every item, and both run only after the
// item was verified. The poll loop blocks until the whole batch found by one
// poll has been handled.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use custody_events::{DiscoveredItem, EventBus, VerifiedItem};
use tracing::Span;
use uuid::Uuid;

use crate::agent::{agent_span, Discoverer};
use crate::archiver::{self, Archiver};
use crate::config::{manifest_dir, PipelineConfig};
use crate::error::PipelineError;
use crate::recorder::{self, Recorder};
use crate::verifier::{self, Verifier};
use crate::watcher::{self, Watcher};

/// Longest the loop sleeps before re-checking the shutdown flag.
const SHUTDOWN_CHECK: Duration = Duration::from_millis(200);

/// Totals for one pipeline instance, taken from the agents' states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub polls: u64,
    pub discovered: u64,
    pub verified: u64,
    pub verify_failures: u64,
    pub recorded: u64,
    pub record_failures: u64,
    pub archived: u64,
    pub archive_failures: u64,
    pub conflicts: u64,
}

pub struct Pipeline {
    config: PipelineConfig,
    run_id: Uuid,
    span: Span,
    bus: Arc<EventBus>,
    watcher: Arc<Watcher>,
    verifier: Arc<Verifier>,
    recorder: Arc<Recorder>,
    archiver: Arc<Archiver>,
}

impl Pipeline {
    /// Create the directories, open the manifest, build and wire the agents.
    ///
    /// Any failure here is fatal: the pipeline can't run without its vault or
    /// its manifest.
    pub fn build(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        ensure_dir(&config.watch_dir)?;
        ensure_dir(&config.vault_dir)?;
        ensure_dir(manifest_dir(&config.manifest))?;
        config.canonicalized()?.validate()?;

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline", run_id = %run_id);
        let bus = Arc::new(EventBus::new());

        let recorder = Arc::new(
            Recorder::open(&config.manifest)?.with_span(agent_span(&span, recorder::AGENT_NAME)),
        );
        let watcher = Arc::new(
            Watcher::recover(&config.watch_dir, Arc::clone(&bus), &config.manifest)?
                .with_span(agent_span(&span, watcher::AGENT_NAME)),
        );
        let verifier = Arc::new(
            Verifier::new(Arc::clone(&bus)).with_span(agent_span(&span, verifier::AGENT_NAME)),
        );
        let archiver = Arc::new(
            Archiver::new(&config.vault_dir)?
                .with_collision_policy(config.collision)
                .with_copy_verification(config.verify_copies)
                .with_span(agent_span(&span, archiver::AGENT_NAME)),
        );

        bus.subscribe::<DiscoveredItem>(verifier.clone());
        bus.subscribe::<VerifiedItem>(recorder.clone());
        bus.subscribe::<VerifiedItem>(archiver.clone());

        Ok(Self {
            config,
            run_id,
            span,
            bus,
            watcher,
            verifier,
            recorder,
            archiver,
        })
    }

    /// Run one discovery pass and everything it triggers.
    pub fn poll_once(&self) -> usize {
        let _entered = self.span.enter();
        self.watcher.poll()
    }

    /// Poll until `shutdown` is raised, sleeping the configured interval
    /// between passes.
    ///
    /// The flag is checked between polls and during the sleep; a poll in
    /// progress always finishes its batch, so no manifest row is cut short.
    pub fn run(&self, shutdown: &AtomicBool) -> RunSummary {
        let mut polls = 0;
        {
            let _entered = self.span.enter();
            tracing::info!(
                watch_dir = %self.config.watch_dir.display(),
                vault_dir = %self.config.vault_dir.display(),
                manifest = %self.config.manifest.display(),
                interval_secs = self.config.poll_interval_secs,
                "custody pipeline active"
            );
        }

        while !shutdown.load(Ordering::SeqCst) {
            self.poll_once();
            polls += 1;
            sleep_unless_stopped(self.config.poll_interval(), shutdown);
        }

        let summary = RunSummary {
            polls,
            ..self.summary()
        };
        let _entered = self.span.enter();
        tracing::info!(
            polls = summary.polls,
            recorded = summary.recorded,
            archived = summary.archived,
            "shutdown signal received, custody manifest closed"
        );
        summary
    }

    /// Current totals across all agents (`polls` is only counted by `run`).
    pub fn summary(&self) -> RunSummary {
        let watcher = self.watcher.state();
        let verifier = self.verifier.state();
        let recorder = self.recorder.state();
        let archiver = self.archiver.state();
        RunSummary {
            polls: 0,
            discovered: watcher.announced,
            verified: verifier.verified,
            verify_failures: verifier.failed,
            recorded: recorder.records_written,
            record_failures: recorder.failed,
            archived: archiver.archived,
            archive_failures: archiver.failed,
            conflicts: archiver.conflicts,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn archiver(&self) -> &Archiver {
        &self.archiver
    }
}

fn ensure_dir(path: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(path).map_err(|source| PipelineError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

fn sleep_unless_stopped(interval: Duration, shutdown: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while !shutdown.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(SHUTDOWN_CHECK.min(deadline - now));
    }
}
