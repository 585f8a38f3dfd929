use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Commit, Issue};

/// The four kinds of harvestable activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    NewIssue,
    IssueComment,
    IssueChange,
    NewCommit,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::NewIssue => "new-issue",
            EventKind::IssueComment => "issue-comment",
            EventKind::IssueChange => "issue-change",
            EventKind::NewCommit => "new-commit",
        }
    }

    /// Map the type tag produced by the summary queries.
    pub fn from_store_tag(tag: &str) -> Option<Self> {
        match tag {
            "issue" => Some(EventKind::NewIssue),
            "comment" => Some(EventKind::IssueComment),
            "change" => Some(EventKind::IssueChange),
            "commit" => Some(EventKind::NewCommit),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lightweight pointer to a harvestable item in the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSummary {
    /// Row id of the activity itself (log entry, comment, change or commit).
    pub event_id: i64,
    pub kind: EventKind,
    /// Back-reference: the issue id, or the commit id for commits.
    pub key: i64,
    pub timestamp: DateTime<Utc>,
}

/// Hydrated content of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPayload {
    Issue(Issue),
    Commit(Commit),
}

/// A fully hydrated event, ready for publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Stable id derived from the source locator, kind and store row.
    pub id: Uuid,
    /// Locator of the originating source.
    pub source: String,
    pub kind: EventKind,
    /// Activity time as recorded in the backing store; becomes the checkpoint.
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl DomainEvent {
    pub fn new(locator: &str, summary: &EventSummary, payload: EventPayload) -> Self {
        Self {
            id: event_uuid(locator, summary.kind, summary.event_id),
            source: locator.to_string(),
            kind: summary.kind,
            timestamp: summary.timestamp,
            payload,
        }
    }
}

/// Deterministic event id, so a redelivered event keeps its identity.
pub fn event_uuid(locator: &str, kind: EventKind, store_id: i64) -> Uuid {
    let name = format!("{locator}#{kind}/{store_id}");
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
}
