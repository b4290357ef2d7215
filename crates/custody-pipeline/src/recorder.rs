// recorder.rs — Appends one chain-of-custody record per verified item.
//
// The recorder does no deduplication. The watcher's seen set is the only
// "already processed" authority; every `verified` event becomes a row.

use std::path::Path;
use std::sync::Mutex;

use custody_audit::{CustodyManifest, Record};
use custody_events::{Handler, VerifiedItem};
use tracing::Span;

use crate::agent::{lock, Activity};
use crate::error::PipelineError;

pub const AGENT_NAME: &str = "Recorder";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecorderState {
    pub activity: Activity,
    pub records_written: u64,
    pub failed: u64,
}

pub struct Recorder {
    manifest: CustodyManifest,
    state: Mutex<RecorderState>,
    span: Span,
}

impl Recorder {
    pub fn new(manifest: CustodyManifest) -> Self {
        Self {
            manifest,
            state: Mutex::new(RecorderState::default()),
            span: tracing::info_span!("agent", agent = AGENT_NAME),
        }
    }

    /// Open (or create) the manifest at `path` and record into it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        Ok(Self::new(CustodyManifest::open(path)?))
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn state(&self) -> RecorderState {
        lock(&self.state).clone()
    }

    /// Append the record for `item`. Returns once the row is on disk.
    pub fn record(&self, item: &VerifiedItem) -> Result<Record, PipelineError> {
        let record = Record::new(AGENT_NAME, &item.path, &item.digest, item.size_bytes);
        self.manifest.append(&record)?;
        Ok(record)
    }
}

impl Handler<VerifiedItem> for Recorder {
    fn handle(&self, item: &VerifiedItem) {
        let _entered = self.span.enter();
        let name = item.file_name();
        lock(&self.state).activity = Activity::Recording(name.clone());

        match self.record(item) {
            Ok(_) => {
                let mut state = lock(&self.state);
                state.records_written += 1;
                state.activity = Activity::Idle;
                tracing::info!(file = %name, "chain of custody updated");
            }
            Err(e) => {
                let mut state = lock(&self.state);
                state.failed += 1;
                state.activity = Activity::ErrorRecovery;
                tracing::error!(
                    file = %name,
                    manifest = %self.manifest.path().display(),
                    stage = "record",
                    error = %e,
                    "failed to record evidence"
                );
            }
        }
    }
}
