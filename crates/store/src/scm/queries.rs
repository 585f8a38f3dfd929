//! SQL issued against the source-control database. SELECT only.

pub(super) const SUMMARIES: &str = "\
SELECT CAST(log.id AS SIGNED) AS commit_id, log.date AS date \
FROM scmlog log, repositories r \
WHERE log.repository_id = r.id AND r.uri = ? AND log.date > ? \
ORDER BY log.date, log.id";

pub(super) const COMMIT: &str = "\
SELECT rev, date, message, CAST(author_id AS SIGNED) AS author_id, \
       CAST(committer_id AS SIGNED) AS committer_id, \
       CAST(repository_id AS SIGNED) AS repository_id \
FROM scmlog WHERE id = ?";

pub(super) const PERSON: &str = "SELECT name, email FROM people WHERE id = ?";

pub(super) const REPOSITORY: &str = "SELECT uri FROM repositories WHERE id = ?";

/// One row per file the commit touched, with the action taken on it.
pub(super) const ACTIONS: &str = "\
SELECT CAST(a.file_id AS SIGNED) AS file_id, a.type AS action, \
       CAST(a.branch_id AS SIGNED) AS branch_id \
FROM actions a WHERE a.commit_id = ? ORDER BY a.id";

/// Path of a file as of a given commit.
pub(super) const FILE_PATH: &str = "\
SELECT file_path FROM file_links \
WHERE file_id = ? AND commit_id <= ? ORDER BY commit_id DESC LIMIT 1";

pub(super) const BRANCH: &str = "SELECT name FROM branches WHERE id = ?";

pub(super) const MODULES: &str = "\
SELECT CAST(id AS SIGNED) AS id, name, CAST(start_line AS SIGNED) AS start_line, \
       CAST(end_line AS SIGNED) AS end_line \
FROM modules_src WHERE file_id = ? AND commit_id = ?";

pub(super) const FUNCTIONS: &str = "\
SELECT header, CAST(start_line AS SIGNED) AS start_line, CAST(end_line AS SIGNED) AS end_line \
FROM functions_src WHERE module_id = ?";
