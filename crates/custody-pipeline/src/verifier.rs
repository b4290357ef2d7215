// verifier.rs — Captures the integrity digest of each discovered file.
//
// Fail-closed: if the file can't be opened, read or stat'ed, nothing is
// published for it. The absence of a `verified` event is the only failure
// signal downstream; no partial record is ever produced.

use std::fs::File;
use std::io::BufReader;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use custody_audit::hasher;
use custody_events::{DiscoveredItem, EventBus, Handler, VerifiedItem};
use tracing::Span;

use crate::agent::{lock, Activity};
use crate::error::PipelineError;

pub const AGENT_NAME: &str = "Verifier";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifierState {
    pub activity: Activity,
    pub last_digest: Option<String>,
    pub verified: u64,
    pub failed: u64,
}

pub struct Verifier {
    bus: Arc<EventBus>,
    state: Mutex<VerifierState>,
    span: Span,
}

impl Verifier {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            state: Mutex::new(VerifierState::default()),
            span: tracing::info_span!("agent", agent = AGENT_NAME),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn state(&self) -> VerifierState {
        lock(&self.state).clone()
    }

    /// Hash a discovered file and capture its size and modification time.
    ///
    /// Metadata is taken from the same open handle that is hashed, so a file
    /// swapped out between the two steps can't mix metadata from one file
    /// with the digest of another.
    pub fn verify(&self, item: &DiscoveredItem) -> Result<VerifiedItem, PipelineError> {
        let io_err = |source| PipelineError::Io {
            path: item.path.clone(),
            source,
        };

        let file = File::open(&item.path).map_err(io_err)?;
        let metadata = file.metadata().map_err(io_err)?;
        if !metadata.is_file() {
            return Err(PipelineError::NotAFile {
                path: item.path.clone(),
            });
        }

        let digest = hasher::hash_reader(BufReader::new(&file)).map_err(io_err)?;
        let modified: DateTime<Utc> = metadata.modified().map_err(io_err)?.into();

        Ok(VerifiedItem {
            path: item.path.clone(),
            digest,
            size_bytes: metadata.len(),
            modified,
        })
    }
}

impl Handler<DiscoveredItem> for Verifier {
    fn handle(&self, item: &DiscoveredItem) {
        let _entered = self.span.enter();
        let name = item.file_name();
        lock(&self.state).activity = Activity::Hashing(name.clone());

        match self.verify(item) {
            Ok(verified) => {
                {
                    let mut state = lock(&self.state);
                    state.last_digest = Some(verified.digest.clone());
                    state.verified += 1;
                    state.activity = Activity::Idle;
                }
                tracing::info!(
                    file = %name,
                    digest = %verified.digest,
                    size_bytes = verified.size_bytes,
                    "integrity captured"
                );
                self.bus.publish(&verified);
            }
            Err(e) => {
                {
                    let mut state = lock(&self.state);
                    state.failed += 1;
                    state.activity = Activity::ErrorRecovery;
                }
                tracing::error!(file = %name, stage = "verify", error = %e, "verification failed, item withheld");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use tempfile::tempdir;

    fn capture(bus: &EventBus) -> Arc<StdMutex<Vec<VerifiedItem>>> {
        let out = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&out);
        bus.subscribe::<VerifiedItem>(Arc::new(move |item: &VerifiedItem| {
            sink.lock().unwrap().push(item.clone());
        }));
        out
    }

    #[test]
    fn publishes_sha256_of_content() {
        let dir = tempdir().unwrap();
        let evidence = dir.path().join("evidence.txt");
        std::fs::write(&evidence, b"Forensic Evidence Data").unwrap();

        let bus = Arc::new(EventBus::new());
        let out = capture(&bus);
        let verifier = Verifier::new(Arc::clone(&bus));
        verifier.handle(&DiscoveredItem::new(&evidence));

        let out = out.lock().unwrap();
        assert_eq!(out.len(), 1);
        let expected = hasher::hash_bytes(b"Forensic Evidence Data");
        assert_eq!(out[0].digest, expected);
        assert_eq!(out[0].size_bytes, 22);
        assert_eq!(out[0].path, evidence);
        assert_eq!(verifier.state().last_digest, Some(expected));
        assert_eq!(verifier.state().verified, 1);
    }

    #[test]
    fn digest_is_deterministic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("same.bin");
        std::fs::write(&path, [0u8, 1, 2, 3, 255]).unwrap();

        let verifier = Verifier::new(Arc::new(EventBus::new()));
        let item = DiscoveredItem::new(&path);
        let first = verifier.verify(&item).unwrap();
        let second = verifier.verify(&item).unwrap();
        assert_eq!(first.digest, second.digest);
        assert_eq!(first.digest.len(), 64);
    }

    #[test]
    fn vanished_file_publishes_nothing() {
        let dir = tempdir().unwrap();
        let bus = Arc::new(EventBus::new());
        let out = capture(&bus);
        let verifier = Verifier::new(Arc::clone(&bus));

        verifier.handle(&DiscoveredItem::new(dir.path().join("removed.txt")));

        assert!(out.lock().unwrap().is_empty());
        let state = verifier.state();
        assert_eq!(state.failed, 1);
        assert_eq!(state.verified, 0);
        assert_eq!(state.activity, Activity::ErrorRecovery);
    }

    #[test]
    fn directory_is_not_verified() {
        let dir = tempdir().unwrap();
        let verifier = Verifier::new(Arc::new(EventBus::new()));
        let result = verifier.verify(&DiscoveredItem::new(dir.path()));
        assert!(result.is_err());
    }
}
