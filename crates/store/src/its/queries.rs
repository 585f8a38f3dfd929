//! SQL issued against the issue-tracker database. SELECT only.

/// Every activity of one tracker newer than a checkpoint: the first log
/// entry of each issue, its comments and its field changes. For equal
/// timestamps an issue precedes its comments, which precede its changes.
pub(super) const SUMMARIES: &str = "\
SELECT CAST(log.id AS SIGNED) AS event_id, CAST(log.issue_id AS SIGNED) AS issue_id, \
       log.date AS date, log.type AS type \
FROM ( \
    (SELECT MIN(id) AS id, issue_id, MIN(date) AS date, 'issue' AS type \
       FROM issues_log GROUP BY issue_id) \
    UNION ALL \
    (SELECT id, issue_id, submitted_on AS date, 'comment' AS type FROM comments) \
    UNION ALL \
    (SELECT id, issue_id, changed_on AS date, 'change' AS type FROM changes) \
) log, issues i, trackers t \
WHERE log.issue_id = i.id AND i.tracker_id = t.id AND t.url = ? AND log.date > ? \
ORDER BY log.date, \
         CASE log.type WHEN 'issue' THEN 0 WHEN 'comment' THEN 1 ELSE 2 END, \
         log.id";

/// The issue as it was first recorded.
pub(super) const NEW_ISSUE: &str = "\
SELECT summary, description, status, resolution, priority, type AS severity, \
       CAST(submitted_by AS SIGNED) AS submitted_by, date AS submitted_on, \
       CAST(assigned_to AS SIGNED) AS assigned_to \
FROM issues_log WHERE issue_id = ? ORDER BY date, id LIMIT 1";

pub(super) const COMMENT: &str = "\
SELECT text, CAST(submitted_by AS SIGNED) AS submitted_by, submitted_on \
FROM comments WHERE id = ?";

pub(super) const CHANGE: &str = "\
SELECT CAST(changed_by AS SIGNED) AS changed_by, changed_on, field, old_value, new_value \
FROM changes WHERE id = ?";

pub(super) const BASIC_ISSUE: &str = "\
SELECT issue, CAST(tracker_id AS SIGNED) AS tracker_id FROM issues WHERE id = ?";

pub(super) const TRACKER: &str = "\
SELECT trackers.url AS url, supported_trackers.name AS name \
FROM trackers, supported_trackers \
WHERE trackers.type = supported_trackers.id AND trackers.id = ?";

pub(super) const PERSON: &str = "SELECT name, email, user_id FROM people WHERE id = ?";

pub(super) const JIRA_LINK: &str = "SELECT link FROM issues_ext_jira WHERE issue_id = ?";
