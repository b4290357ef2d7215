// watcher.rs — Discovers new evidence files in the watch directory.
//
// The watcher keeps the set of file names it has already announced. The set
// only grows, and it is seeded from the custody manifest so a restarted
// process does not announce, hash or archive the same file again.
//
// Files are announced in file-name order so a batch is processed the same
// way on every platform. Identity is the raw OS file name: two names that
// only differ in bytes that aren't valid UTF-8 are still two files.

use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use custody_audit::CustodyManifest;
use custody_events::{DiscoveredItem, EventBus};
use tracing::Span;

use crate::agent::{lock, Activity, Discoverer};
use crate::error::PipelineError;

pub const AGENT_NAME: &str = "Watcher";

/// The watcher's beliefs about the watch directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherState {
    /// File names already announced (or recorded by an earlier run).
    pub seen: BTreeSet<OsString>,
    pub activity: Activity,
    /// Items announced by this instance.
    pub announced: u64,
}

pub struct Watcher {
    watch_dir: PathBuf,
    bus: Arc<EventBus>,
    state: Mutex<WatcherState>,
    span: Span,
}

impl Watcher {
    /// Create a watcher that has seen nothing yet.
    pub fn new(watch_dir: impl Into<PathBuf>, bus: Arc<EventBus>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            bus,
            state: Mutex::new(WatcherState::default()),
            span: tracing::info_span!("agent", agent = AGENT_NAME),
        }
    }

    /// Create a watcher whose seen set is rebuilt from a custody manifest.
    pub fn recover(
        watch_dir: impl Into<PathBuf>,
        bus: Arc<EventBus>,
        manifest: impl AsRef<Path>,
    ) -> Result<Self, PipelineError> {
        let recorded = CustodyManifest::recorded_file_names(manifest.as_ref())?;
        let watcher = Self::new(watch_dir, bus).with_seen(recorded);
        tracing::info!(
            manifest = %manifest.as_ref().display(),
            recovered = lock(&watcher.state).seen.len(),
            "rebuilt seen set from manifest"
        );
        Ok(watcher)
    }

    /// Mark names as already seen (builder pattern).
    pub fn with_seen<N: Into<OsString>>(self, names: impl IntoIterator<Item = N>) -> Self {
        lock(&self.state).seen.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn has_seen(&self, file_name: impl AsRef<OsStr>) -> bool {
        lock(&self.state).seen.contains(file_name.as_ref())
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> WatcherState {
        lock(&self.state).clone()
    }

    /// Regular files directly inside the watch directory, sorted by name.
    ///
    /// A missing directory yields nothing; other listing errors are logged
    /// and also yield nothing for this pass.
    pub fn scan(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.watch_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(dir = %self.watch_dir.display(), "watch directory absent");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(dir = %self.watch_dir.display(), error = %e, "cannot list watch directory");
                return Vec::new();
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable directory entry");
                    None
                }
            })
            .filter(|path| path.is_file())
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        files
    }
}

impl Discoverer for Watcher {
    fn poll(&self) -> usize {
        let _entered = self.span.enter();
        lock(&self.state).activity = Activity::Scanning;

        let mut announced = 0;
        for path in self.scan() {
            let Some(key) = path.file_name().map(OsStr::to_os_string) else {
                continue;
            };
            let name = key.to_string_lossy().into_owned();
            let lossy = key.to_str().is_none();
            {
                // Check and insert under one lock so concurrent polls can't
                // both claim the same name.
                let mut state = lock(&self.state);
                if !state.seen.insert(key) {
                    continue;
                }
                state.activity = Activity::Announcing(name.clone());
                state.announced += 1;
            }

            if lossy {
                tracing::warn!(
                    file = %name,
                    path = ?path,
                    "file name is not valid UTF-8; the manifest will hold a lossy name"
                );
            }
            tracing::info!(file = %name, "new evidence");
            self.bus.publish(&DiscoveredItem::new(path));
            announced += 1;
        }

        lock(&self.state).activity = Activity::Idle;
        announced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use tempfile::tempdir;

    fn collecting_bus() -> (Arc<EventBus>, Arc<StdMutex<Vec<String>>>) {
        let bus = Arc::new(EventBus::new());
        let names = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&names);
        bus.subscribe::<DiscoveredItem>(Arc::new(move |item: &DiscoveredItem| {
            sink.lock().unwrap().push(item.file_name());
        }));
        (bus, names)
    }

    #[test]
    fn scan_finds_regular_files_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("evidence_1.txt"), "content").unwrap();
        fs::write(dir.path().join("evidence_2.jpg"), "image_data").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("deep.txt"), "x").unwrap();

        let watcher = Watcher::new(dir.path(), Arc::new(EventBus::new()));
        let found = watcher.scan();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn poll_announces_each_new_file_once() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("evidence_2.jpg"), "image_data").unwrap();
        fs::write(dir.path().join("evidence_1.txt"), "content").unwrap();

        let (bus, names) = collecting_bus();
        let watcher = Watcher::new(dir.path(), bus);

        assert_eq!(watcher.poll(), 2);
        assert_eq!(watcher.poll(), 0);
        assert_eq!(
            *names.lock().unwrap(),
            vec!["evidence_1.txt".to_string(), "evidence_2.jpg".to_string()]
        );
        assert!(watcher.has_seen("evidence_1.txt"));
        assert_eq!(watcher.state().activity, Activity::Idle);
        assert_eq!(watcher.state().announced, 2);
    }

    #[test]
    fn poll_picks_up_files_added_later() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let (bus, names) = collecting_bus();
        let watcher = Watcher::new(dir.path(), bus);
        assert_eq!(watcher.poll(), 1);

        fs::write(dir.path().join("b.txt"), "b").unwrap();
        assert_eq!(watcher.poll(), 1);
        assert_eq!(names.lock().unwrap().len(), 2);
    }

    #[test]
    fn already_seen_file_is_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("repeat.txt"), "data").unwrap();

        let (bus, names) = collecting_bus();
        let watcher = Watcher::new(dir.path(), bus).with_seen(["repeat.txt".to_string()]);

        assert_eq!(watcher.poll(), 0);
        assert!(names.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_watch_dir_yields_nothing() {
        let dir = tempdir().unwrap();
        let (bus, names) = collecting_bus();
        let watcher = Watcher::new(dir.path().join("not-there"), bus);

        assert_eq!(watcher.poll(), 0);
        assert!(names.lock().unwrap().is_empty());
    }

    #[test]
    fn recover_skips_files_in_manifest() {
        let dir = tempdir().unwrap();
        let watch = dir.path().join("in");
        fs::create_dir(&watch).unwrap();
        fs::write(watch.join("a.txt"), "a").unwrap();
        fs::write(watch.join("b.txt"), "b").unwrap();

        let manifest_path = dir.path().join("manifest.csv");
        let manifest = CustodyManifest::open(&manifest_path).unwrap();
        manifest
            .append(&custody_audit::Record::new(
                "Recorder",
                watch.join("a.txt"),
                custody_audit::hasher::hash_str("a"),
                1,
            ))
            .unwrap();

        let (bus, names) = collecting_bus();
        let watcher = Watcher::recover(&watch, bus, &manifest_path).unwrap();

        assert_eq!(watcher.poll(), 1);
        assert_eq!(*names.lock().unwrap(), vec!["b.txt".to_string()]);
    }

    #[test]
    fn concurrent_polls_never_double_announce() {
        let dir = tempdir().unwrap();
        for i in 0..20 {
            fs::write(dir.path().join(format!("file_{:02}.bin", i)), [i as u8]).unwrap();
        }

        let (bus, names) = collecting_bus();
        let watcher = Arc::new(Watcher::new(dir.path(), bus));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let watcher = Arc::clone(&watcher);
                std::thread::spawn(move || watcher.poll())
            })
            .collect();
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(total, 20);
        let mut names = names.lock().unwrap().clone();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 20);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_are_distinct_files() {
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        let first = OsStr::from_bytes(b"ev\xff.bin");
        let second = OsStr::from_bytes(b"ev\xfe.bin");
        fs::write(dir.path().join(first), "one").unwrap();
        fs::write(dir.path().join(second), "two").unwrap();

        let (bus, names) = collecting_bus();
        let watcher = Watcher::new(dir.path(), bus);

        assert_eq!(watcher.poll(), 2);
        assert_eq!(watcher.poll(), 0);
        assert_eq!(names.lock().unwrap().len(), 2);
        assert!(watcher.has_seen(first));
        assert!(watcher.has_seen(second));
    }
}
