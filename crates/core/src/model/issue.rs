use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Person;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Blocker,
    Critical,
    Major,
    Normal,
    Minor,
    Trivial,
    Feature,
    #[default]
    None,
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Open,
    Assigned,
    Resolved,
    Verified,
    Closed,
    #[default]
    None,
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Duplicated,
    Fixed,
    Invalid,
    Later,
    Remind,
    ThirdParty,
    WontFix,
    WorksForMe,
    #[default]
    None,
    Unknown,
}

/// Priority on a 1 (lowest) to 5 (highest) scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Level(u8),
    #[default]
    None,
    Unknown,
}

/// Whether an issue event announces a new issue or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueUpdate {
    New,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTracker {
    pub url: String,
    /// Tracker software name as recorded by the miner (e.g. "jira").
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub author: Option<Person>,
    pub date: DateTime<Utc>,
    pub text: String,
}

/// A single field change on an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub who: Option<Person>,
    pub when: DateTime<Utc>,
    pub what: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub tracker: IssueTracker,
    /// Public issue id on the tracker (e.g. "KESI-12").
    pub id: String,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub date_opened: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    pub reporter: Option<Person>,
    pub assigned_to: Option<Person>,
    pub severity: Severity,
    pub status: Status,
    pub resolution: Resolution,
    pub priority: Priority,
    pub comments: Vec<Comment>,
    pub activities: Vec<Activity>,
    pub update: IssueUpdate,
}

impl Issue {
    pub fn new(tracker: IssueTracker, id: impl Into<String>, update: IssueUpdate) -> Self {
        Self {
            tracker,
            id: id.into(),
            url: None,
            summary: None,
            description: None,
            date_opened: None,
            last_modified: None,
            reporter: None,
            assigned_to: None,
            severity: Severity::default(),
            status: Status::default(),
            resolution: Resolution::default(),
            priority: Priority::default(),
            comments: Vec::new(),
            activities: Vec::new(),
            update,
        }
    }
}
