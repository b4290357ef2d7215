// agent.rs — Capabilities and activity labels shared by the pipeline agents.
//
// Agents implement only what they do: the watcher is a `Discoverer`; the
// verifier, recorder and archiver are `custody_events::Handler`s for the one
// payload they consume.

use std::fmt;

use tracing::Span;

/// Something that looks for new work and announces it on the bus.
pub trait Discoverer: Send + Sync {
    /// Run one discovery pass. Returns how many items were announced.
    fn poll(&self) -> usize;
}

/// What an agent is doing right now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Activity {
    #[default]
    Idle,
    Scanning,
    Announcing(String),
    Hashing(String),
    Recording(String),
    Archiving(String),
    /// The last unit of work failed; the agent is ready for the next one.
    ErrorRecovery,
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activity::Idle => write!(f, "idle"),
            Activity::Scanning => write!(f, "scanning"),
            Activity::Announcing(name) => write!(f, "announcing {}", name),
            Activity::Hashing(name) => write!(f, "hashing {}", name),
            Activity::Recording(name) => write!(f, "recording {}", name),
            Activity::Archiving(name) => write!(f, "archiving {}", name),
            Activity::ErrorRecovery => write!(f, "error recovery"),
        }
    }
}

/// Span an agent enters while it works. The orchestrator passes its own run
/// span as the parent so every log line carries the run id.
pub fn agent_span(parent: &Span, name: &'static str) -> Span {
    tracing::info_span!(parent: parent, "agent", agent = name)
}

/// Lock a state mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
