use chrono::{DateTime, Utc};
use kesi_core::DomainEvent;

use crate::registry::SourceHandle;

/// Mine a source with its external tool.
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub source: SourceHandle,
}

/// Generate events for a source newer than `since`.
#[derive(Debug, Clone)]
pub struct EventJob {
    pub source: SourceHandle,
    pub since: DateTime<Utc>,
}

/// Identifies one generation run; events of a run share checkpoint fate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(pub u64);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum PublicationJob {
    /// A hydrated event, in summary order within its run.
    Event { run: RunId, event: DomainEvent },
    /// The generator has nothing more for this run.
    RunFinished { run: RunId, locator: String },
}
