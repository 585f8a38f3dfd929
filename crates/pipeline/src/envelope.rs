use chrono::{DateTime, Utc};
use kesi_bus::topics;
use kesi_core::{DomainEvent, EventKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Routing metadata stamped on every published event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub sender: String,
    /// Transmission time, not the activity time.
    pub timestamp: DateTime<Utc>,
    pub sequence_number: u64,
    pub event_id: Uuid,
    pub event_name: EventKind,
}

/// The document placed on the bus: header plus the domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub header: Header,
    pub event: DomainEvent,
}

impl Envelope {
    pub fn wrap(sender: &str, sequence_number: u64, event: DomainEvent) -> Self {
        Self {
            header: Header {
                sender: sender.to_string(),
                timestamp: Utc::now(),
                sequence_number,
                event_id: event.id,
                event_name: event.kind,
            },
            event,
        }
    }

    pub fn topic(&self) -> &'static str {
        topic_for(self.event.kind)
    }
}

/// Bus topic for an event kind. Comments and field changes share the
/// issue-update topic.
pub fn topic_for(kind: EventKind) -> &'static str {
    match kind {
        EventKind::NewCommit => topics::COMMIT_NEW,
        EventKind::NewIssue => topics::ISSUE_NEW,
        EventKind::IssueComment | EventKind::IssueChange => topics::ISSUE_UPDATE,
    }
}
