mod dialect;
mod queries;

use chrono::{DateTime, NaiveDateTime, Utc};
use kesi_core::{
    Activity, Comment, DomainEvent, EventKind, EventPayload, EventSummary, Issue, IssueTracker,
    IssueUpdate, Person, SourceFamily,
};
use sqlx::MySqlPool;
use tracing::{debug, warn};

use crate::cache::LookupCache;
use crate::error::{ExtractionError, HydrationError};
use crate::summary::SummarySet;

pub use dialect::Dialect;

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    event_id: i64,
    issue_id: i64,
    date: NaiveDateTime,
    #[sqlx(rename = "type")]
    kind: String,
}

#[derive(Debug, sqlx::FromRow)]
struct NewIssueRow {
    summary: Option<String>,
    description: Option<String>,
    status: Option<String>,
    resolution: Option<String>,
    priority: Option<String>,
    severity: Option<String>,
    submitted_by: Option<i64>,
    submitted_on: NaiveDateTime,
    assigned_to: Option<i64>,
}

#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    text: Option<String>,
    submitted_by: Option<i64>,
    submitted_on: NaiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
struct ChangeRow {
    changed_by: Option<i64>,
    changed_on: NaiveDateTime,
    field: String,
    old_value: Option<String>,
    new_value: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct BasicIssueRow {
    issue: String,
    tracker_id: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct TrackerRow {
    url: String,
    name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct PersonRow {
    name: Option<String>,
    email: Option<String>,
    user_id: Option<String>,
}

/// Reader over the issue-tracker database for one tracker.
///
/// People and trackers are cached for the lifetime of the reader, which
/// is one generation run.
pub struct ItsReader {
    pool: MySqlPool,
    locator: String,
    dialect: Dialect,
    people: LookupCache<Person>,
    trackers: LookupCache<IssueTracker>,
}

impl ItsReader {
    pub fn new(pool: MySqlPool, locator: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            pool,
            locator: locator.into(),
            dialect,
            people: LookupCache::new(),
            trackers: LookupCache::new(),
        }
    }

    pub async fn summarize(&mut self, since: DateTime<Utc>) -> Result<SummarySet, ExtractionError> {
        let rows = sqlx::query_as::<_, SummaryRow>(queries::SUMMARIES)
            .bind(&self.locator)
            .bind(since.naive_utc())
            .fetch_all(&self.pool)
            .await
            .map_err(|source| ExtractionError::Query {
                locator: self.locator.clone(),
                source,
            })?;

        let summaries = rows.into_iter().filter_map(|row| {
            let Some(kind) = EventKind::from_store_tag(&row.kind) else {
                warn!(locator = %self.locator, tag = %row.kind, "ignoring unknown activity type");
                return None;
            };
            Some(EventSummary {
                event_id: row.event_id,
                kind,
                key: row.issue_id,
                timestamp: row.date.and_utc(),
            })
        });
        let set = SummarySet::new(since, summaries.collect::<Vec<_>>());
        debug!(locator = %self.locator, pending = set.remaining(), "issue activity summarized");
        Ok(set)
    }

    pub async fn hydrate(&mut self, summary: &EventSummary) -> Result<DomainEvent, HydrationError> {
        let issue = match summary.kind {
            EventKind::NewIssue => self.new_issue(summary.key).await?,
            EventKind::IssueComment => self.comment_update(summary.event_id, summary.key).await?,
            EventKind::IssueChange => self.change_update(summary.event_id, summary.key).await?,
            EventKind::NewCommit => {
                return Err(HydrationError::UnsupportedKind {
                    kind: summary.kind,
                    family: SourceFamily::IssueTracker,
                })
            }
        };
        Ok(DomainEvent::new(&self.locator, summary, EventPayload::Issue(issue)))
    }

    async fn new_issue(&mut self, issue_id: i64) -> Result<Issue, HydrationError> {
        let row = sqlx::query_as::<_, NewIssueRow>(queries::NEW_ISSUE)
            .bind(issue_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(HydrationError::query("issue log", issue_id))?
            .ok_or(HydrationError::Missing {
                entity: "issue log",
                id: issue_id,
            })?;

        let reporter = self.person(row.submitted_by).await?;
        let assignee = self.person(row.assigned_to).await?;
        let base = self.basic_issue(issue_id, IssueUpdate::New).await?;
        Ok(fill_new_issue(base, row, reporter, assignee, self.dialect))
    }

    async fn comment_update(
        &mut self,
        comment_id: i64,
        issue_id: i64,
    ) -> Result<Issue, HydrationError> {
        let row = sqlx::query_as::<_, CommentRow>(queries::COMMENT)
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(HydrationError::query("comment", comment_id))?
            .ok_or(HydrationError::Missing {
                entity: "comment",
                id: comment_id,
            })?;

        let author = self.person(row.submitted_by).await?;
        let base = self.basic_issue(issue_id, IssueUpdate::Update).await?;
        Ok(fill_comment(base, row, author))
    }

    async fn change_update(
        &mut self,
        change_id: i64,
        issue_id: i64,
    ) -> Result<Issue, HydrationError> {
        let row = sqlx::query_as::<_, ChangeRow>(queries::CHANGE)
            .bind(change_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(HydrationError::query("change", change_id))?
            .ok_or(HydrationError::Missing {
                entity: "change",
                id: change_id,
            })?;

        let who = self.person(row.changed_by).await?;
        let base = self.basic_issue(issue_id, IssueUpdate::Update).await?;
        Ok(fill_change(base, row, who, self.dialect))
    }

    /// Public id, tracker and URL of an issue.
    async fn basic_issue(
        &mut self,
        issue_id: i64,
        update: IssueUpdate,
    ) -> Result<Issue, HydrationError> {
        let row = sqlx::query_as::<_, BasicIssueRow>(queries::BASIC_ISSUE)
            .bind(issue_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(HydrationError::query("issue", issue_id))?
            .ok_or(HydrationError::Missing {
                entity: "issue",
                id: issue_id,
            })?;

        let tracker = self.tracker(row.tracker_id).await?;
        let url = match self.dialect {
            Dialect::Jira => self.jira_link(issue_id).await?,
            other => other.derived_issue_url(&tracker.url, &row.issue),
        };
        let mut issue = Issue::new(tracker, row.issue, update);
        issue.url = url;
        Ok(issue)
    }

    async fn jira_link(&self, issue_id: i64) -> Result<Option<String>, HydrationError> {
        let link: Option<(Option<String>,)> = sqlx::query_as(queries::JIRA_LINK)
            .bind(issue_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(HydrationError::query("jira link", issue_id))?;
        Ok(link.and_then(|(l,)| l).filter(|l| !l.is_empty()))
    }

    async fn tracker(&mut self, tracker_id: i64) -> Result<IssueTracker, HydrationError> {
        let pool = &self.pool;
        self.trackers
            .get_or_fetch(tracker_id, |id| fetch_tracker(pool, id))
            .await?
            .ok_or(HydrationError::Missing {
                entity: "tracker",
                id: tracker_id,
            })
    }

    /// Resolve a people row. Absent or zero ids mean nobody.
    async fn person(&mut self, id: Option<i64>) -> Result<Option<Person>, HydrationError> {
        let Some(id) = id.filter(|id| *id > 0) else {
            return Ok(None);
        };
        let pool = &self.pool;
        self.people.get_or_fetch(id, |id| fetch_person(pool, id)).await
    }
}

async fn fetch_tracker(pool: &MySqlPool, id: i64) -> Result<Option<IssueTracker>, HydrationError> {
    let row = sqlx::query_as::<_, TrackerRow>(queries::TRACKER)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(HydrationError::query("tracker", id))?;
    Ok(row.map(|row| IssueTracker {
        url: row.url,
        name: row.name,
    }))
}

async fn fetch_person(pool: &MySqlPool, id: i64) -> Result<Option<Person>, HydrationError> {
    let row = sqlx::query_as::<_, PersonRow>(queries::PERSON)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(HydrationError::query("person", id))?;
    if row.is_none() {
        debug!(person_id = id, "person referenced but not stored");
    }
    Ok(row.map(|row| Person {
        name: row.name,
        email: row.email,
        user_id: row.user_id,
    }))
}

/// The original description becomes the first comment, by the reporter at
/// submission time; the summary line becomes the description.
fn fill_new_issue(
    mut issue: Issue,
    row: NewIssueRow,
    reporter: Option<Person>,
    assignee: Option<Person>,
    dialect: Dialect,
) -> Issue {
    let opened = row.submitted_on.and_utc();
    issue.comments.push(Comment {
        author: reporter.clone(),
        date: opened,
        text: row.description.unwrap_or_default(),
    });
    issue.description = row.summary.clone();
    issue.summary = row.summary;
    issue.date_opened = Some(opened);
    issue.last_modified = Some(opened);
    issue.status = dialect.status(row.status.as_deref().unwrap_or_default());
    issue.resolution = dialect.resolution(row.resolution.as_deref().unwrap_or_default());
    issue.priority = dialect.priority(row.priority.as_deref().unwrap_or_default());
    issue.severity = dialect.severity(row.severity.as_deref().unwrap_or_default());
    issue.reporter = reporter;
    issue.assigned_to = assignee;
    issue
}

fn fill_comment(mut issue: Issue, row: CommentRow, author: Option<Person>) -> Issue {
    let date = row.submitted_on.and_utc();
    issue.last_modified = Some(date);
    issue.comments.push(Comment {
        author,
        date,
        text: row.text.unwrap_or_default(),
    });
    issue
}

fn fill_change(mut issue: Issue, row: ChangeRow, who: Option<Person>, dialect: Dialect) -> Issue {
    let activity = Activity {
        who,
        when: row.changed_on.and_utc(),
        what: row.field,
        old_value: row.old_value,
        new_value: row.new_value,
    };
    issue.last_modified = Some(activity.when);
    if dialect == Dialect::Jira {
        apply_jira_change(&mut issue, &activity);
    }
    issue.activities.push(activity);
    issue
}

/// Jira changes to a tracked field also carry the new field value.
fn apply_jira_change(issue: &mut Issue, change: &Activity) {
    let new_value = change.new_value.as_deref().unwrap_or_default();
    match change.what.as_str() {
        "Assignee" => {
            issue.assigned_to = Some(Person {
                name: Some(new_value.to_string()),
                ..Person::default()
            })
        }
        "Priority" => issue.priority = Dialect::Jira.priority(new_value),
        "Resolution" => issue.resolution = Dialect::Jira.resolution(new_value),
        "Status" => issue.status = Dialect::Jira.status(new_value),
        "Summary" => issue.description = Some(new_value.to_string()),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kesi_core::{Priority, Resolution, Severity, Status};

    fn tracker() -> IssueTracker {
        IssueTracker {
            url: "https://issues.example.org/jira".into(),
            name: "jira".into(),
        }
    }

    fn submitted() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2012, 9, 4)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    #[test]
    fn new_issue_description_becomes_first_comment() {
        let row = NewIssueRow {
            summary: Some("Crash on start".into()),
            description: Some("Steps to reproduce: ...".into()),
            status: Some("Open".into()),
            resolution: Some("".into()),
            priority: Some("Critical".into()),
            severity: Some("Major".into()),
            submitted_by: Some(3),
            submitted_on: submitted(),
            assigned_to: None,
        };
        let reporter = Person::with_email("ada@example.org");
        let base = Issue::new(tracker(), "KESI-1", IssueUpdate::New);

        let issue = fill_new_issue(base, row, Some(reporter.clone()), None, Dialect::Jira);

        assert_eq!(issue.comments.len(), 1);
        assert_eq!(issue.comments[0].text, "Steps to reproduce: ...");
        assert_eq!(issue.comments[0].author, Some(reporter.clone()));
        assert_eq!(issue.comments[0].date, submitted().and_utc());
        assert_eq!(issue.description.as_deref(), Some("Crash on start"));
        assert_eq!(issue.status, Status::Open);
        assert_eq!(issue.resolution, Resolution::None);
        assert_eq!(issue.priority, Priority::Level(4));
        assert_eq!(issue.severity, Severity::Major);
        assert_eq!(issue.reporter, Some(reporter));
        assert_eq!(issue.date_opened, Some(submitted().and_utc()));
    }

    fn change(what: &str, new_value: &str) -> Activity {
        Activity {
            who: None,
            when: submitted().and_utc(),
            what: what.into(),
            old_value: None,
            new_value: Some(new_value.into()),
        }
    }

    #[test]
    fn jira_change_updates_tracked_fields() {
        let mut issue = Issue::new(tracker(), "KESI-1", IssueUpdate::Update);

        apply_jira_change(&mut issue, &change("Status", "In Progress"));
        assert_eq!(issue.status, Status::Assigned);

        apply_jira_change(&mut issue, &change("Resolution", "Duplicate"));
        assert_eq!(issue.resolution, Resolution::Duplicated);

        apply_jira_change(&mut issue, &change("Assignee", "bob"));
        assert_eq!(
            issue.assigned_to.as_ref().unwrap().name.as_deref(),
            Some("bob")
        );

        apply_jira_change(&mut issue, &change("Summary", "Crash on exit"));
        assert_eq!(issue.description.as_deref(), Some("Crash on exit"));
    }

    #[test]
    fn comment_is_appended_at_its_date() {
        let row = CommentRow {
            text: Some("Still crashes on 2.1".into()),
            submitted_by: Some(4),
            submitted_on: submitted(),
        };
        let author = Person::with_email("bob@example.org");
        let base = Issue::new(tracker(), "KESI-1", IssueUpdate::Update);

        let issue = fill_comment(base, row, Some(author.clone()));

        assert_eq!(issue.update, IssueUpdate::Update);
        assert_eq!(issue.comments.len(), 1);
        assert_eq!(issue.comments[0].author, Some(author));
        assert_eq!(issue.comments[0].text, "Still crashes on 2.1");
        assert_eq!(issue.last_modified, Some(submitted().and_utc()));
        assert!(issue.activities.is_empty());
    }

    #[test]
    fn comment_without_text_is_empty() {
        let row = CommentRow {
            text: None,
            submitted_by: None,
            submitted_on: submitted(),
        };
        let base = Issue::new(tracker(), "KESI-1", IssueUpdate::Update);
        let issue = fill_comment(base, row, None);
        assert_eq!(issue.comments[0].text, "");
        assert_eq!(issue.comments[0].author, None);
    }

    fn change_row(field: &str, new_value: &str) -> ChangeRow {
        ChangeRow {
            changed_by: Some(5),
            changed_on: submitted(),
            field: field.into(),
            old_value: Some("Open".into()),
            new_value: Some(new_value.into()),
        }
    }

    #[test]
    fn change_becomes_an_activity() {
        let who = Person::with_email("carol@example.org");
        let base = Issue::new(tracker(), "KESI-1", IssueUpdate::Update);

        let row = change_row("Status", "Closed");

        let issue = fill_change(base, row, Some(who.clone()), Dialect::Jira);

        assert_eq!(issue.activities.len(), 1);
        let activity = &issue.activities[0];
        assert_eq!(activity.who, Some(who));
        assert_eq!(activity.what, "Status");
        assert_eq!(activity.old_value.as_deref(), Some("Open"));
        assert_eq!(activity.new_value.as_deref(), Some("Closed"));
        assert_eq!(issue.last_modified, Some(submitted().and_utc()));
        assert_eq!(issue.status, Status::Closed);
    }

    #[test]
    fn only_jira_changes_update_fields() {
        let base = Issue::new(tracker(), "301", IssueUpdate::Update);
        let issue = fill_change(base, change_row("Status", "CLOSED"), None, Dialect::Bugzilla);
        assert_eq!(issue.status, Status::None);
        assert_eq!(issue.activities.len(), 1);
    }

    #[test]
    fn jira_change_to_untracked_field_is_ignored() {
        let mut issue = Issue::new(tracker(), "KESI-1", IssueUpdate::Update);
        apply_jira_change(&mut issue, &change("Component", "core"));
        assert_eq!(issue.status, Status::None);
        assert!(issue.description.is_none());
    }
}
