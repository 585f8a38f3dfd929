mod queries;

use chrono::{DateTime, NaiveDateTime, Utc};
use kesi_core::{
    Commit, DomainEvent, EventKind, EventPayload, EventSummary, FileAction, FileChange, Function,
    Module, Person, SourceFamily,
};
use sqlx::MySqlPool;
use tracing::debug;

use crate::cache::LookupCache;
use crate::error::{ExtractionError, HydrationError};
use crate::summary::SummarySet;

/// SQLSTATE for a missing table; the metrics tables only exist when the
/// miner ran with its Metrics extension.
const NO_SUCH_TABLE: &str = "42S02";

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    commit_id: i64,
    date: NaiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
struct CommitRow {
    rev: String,
    date: NaiveDateTime,
    message: Option<String>,
    author_id: Option<i64>,
    committer_id: Option<i64>,
    repository_id: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ActionRow {
    file_id: i64,
    action: String,
    branch_id: Option<i64>,
}

#[derive(Debug, sqlx::FromRow)]
struct ModuleRow {
    id: i64,
    name: String,
    start_line: i64,
    end_line: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct FunctionRow {
    header: String,
    start_line: i64,
    end_line: i64,
}

/// Reader over the source-control database for one repository.
pub struct ScmReader {
    pool: MySqlPool,
    locator: String,
    people: LookupCache<Person>,
    repositories: LookupCache<String>,
    branches: LookupCache<String>,
    metrics_available: bool,
}

impl ScmReader {
    pub fn new(pool: MySqlPool, locator: impl Into<String>) -> Self {
        Self {
            pool,
            locator: locator.into(),
            people: LookupCache::new(),
            repositories: LookupCache::new(),
            branches: LookupCache::new(),
            metrics_available: true,
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

        let summaries: Vec<EventSummary> = rows
            .into_iter()
            .map(|row| EventSummary {
                event_id: row.commit_id,
                kind: EventKind::NewCommit,
                key: row.commit_id,
                timestamp: row.date.and_utc(),
            })
            .collect();
        let set = SummarySet::new(since, summaries);
        debug!(locator = %self.locator, pending = set.remaining(), "commits summarized");
        Ok(set)
    }

    pub async fn hydrate(&mut self, summary: &EventSummary) -> Result<DomainEvent, HydrationError> {
        if summary.kind != EventKind::NewCommit {
            return Err(HydrationError::UnsupportedKind {
                kind: summary.kind,
                family: SourceFamily::SourceControl,
            });
        }
        let commit = self.commit(summary.key).await?;
        Ok(DomainEvent::new(&self.locator, summary, EventPayload::Commit(commit)))
    }

    async fn commit(&mut self, commit_id: i64) -> Result<Commit, HydrationError> {
        let row = sqlx::query_as::<_, CommitRow>(queries::COMMIT)
            .bind(commit_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(HydrationError::query("commit", commit_id))?
            .ok_or(HydrationError::Missing {
                entity: "commit",
                id: commit_id,
            })?;

        let author = self.person(row.author_id).await?;
        let committer = self.person(row.committer_id).await?;
        let repository = self.repository(row.repository_id).await?;
        let files = self.files(commit_id).await?;
        Ok(assemble_commit(commit_id, row, author, committer, repository, files))
    }

    async fn files(&mut self, commit_id: i64) -> Result<Vec<FileChange>, HydrationError> {
        let actions = sqlx::query_as::<_, ActionRow>(queries::ACTIONS)
            .bind(commit_id)
            .fetch_all(&self.pool)
            .await
            .map_err(HydrationError::query("actions of commit", commit_id))?;

        let mut files = Vec::with_capacity(actions.len());
        for action in actions {
            let path: Option<(Option<String>,)> = sqlx::query_as(queries::FILE_PATH)
                .bind(action.file_id)
                .bind(commit_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(HydrationError::query("file path", action.file_id))?;
            let branch = self.branch(action.branch_id).await?;
            let modules = self.modules(action.file_id, commit_id).await?;
            files.push(file_change(&action, path.and_then(|(p,)| p), branch, modules));
        }
        Ok(files)
    }

    async fn modules(
        &mut self,
        file_id: i64,
        commit_id: i64,
    ) -> Result<Vec<Module>, HydrationError> {
        if !self.metrics_available {
            return Ok(Vec::new());
        }
        let rows = match sqlx::query_as::<_, ModuleRow>(queries::MODULES)
            .bind(file_id)
            .bind(commit_id)
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => rows,
            Err(e) if is_missing_table(&e) => {
                debug!(locator = %self.locator, "no metrics tables, skipping modules");
                self.metrics_available = false;
                return Ok(Vec::new());
            }
            Err(e) => return Err(HydrationError::query("modules of file", file_id)(e)),
        };

        let mut modules = Vec::with_capacity(rows.len());
        for row in rows {
            let functions = sqlx::query_as::<_, FunctionRow>(queries::FUNCTIONS)
                .bind(row.id)
                .fetch_all(&self.pool)
                .await
                .map_err(HydrationError::query("functions of module", row.id))?;
            modules.push(module(row, functions));
        }
        Ok(modules)
    }

    async fn branch(&mut self, branch_id: Option<i64>) -> Result<Option<String>, HydrationError> {
        let Some(id) = branch_id else {
            return Ok(None);
        };
        let pool = &self.pool;
        self.branches
            .get_or_fetch(id, |id| fetch_name(pool, queries::BRANCH, "branch", id))
            .await
    }

    async fn repository(&mut self, repository_id: i64) -> Result<Option<String>, HydrationError> {
        let pool = &self.pool;
        self.repositories
            .get_or_fetch(repository_id, |id| {
                fetch_name(pool, queries::REPOSITORY, "repository", id)
            })
            .await
    }

    async fn person(&mut self, id: Option<i64>) -> Result<Option<Person>, HydrationError> {
        let Some(id) = id.filter(|id| *id > 0) else {
            return Ok(None);
        };
        let pool = &self.pool;
        self.people.get_or_fetch(id, |id| fetch_person(pool, id)).await
    }
}

/// Single-column lookup of a branch name or repository URI.
async fn fetch_name(
    pool: &MySqlPool,
    query: &'static str,
    entity: &'static str,
    id: i64,
) -> Result<Option<String>, HydrationError> {
    let row: Option<(String,)> = sqlx::query_as(query)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(HydrationError::query(entity, id))?;
    Ok(row.map(|(name,)| name))
}

async fn fetch_person(pool: &MySqlPool, id: i64) -> Result<Option<Person>, HydrationError> {
    let row: Option<(Option<String>, Option<String>)> = sqlx::query_as(queries::PERSON)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(HydrationError::query("person", id))?;
    Ok(row.map(|(name, email)| Person {
        name,
        email,
        user_id: None,
    }))
}

fn assemble_commit(
    id: i64,
    row: CommitRow,
    author: Option<Person>,
    committer: Option<Person>,
    repository: Option<String>,
    files: Vec<FileChange>,
) -> Commit {
    Commit {
        id,
        repository,
        revision: row.rev,
        message: row.message.unwrap_or_default(),
        date: row.date.and_utc(),
        author,
        committer,
        files,
    }
}

fn file_change(
    action: &ActionRow,
    path: Option<String>,
    branch: Option<String>,
    modules: Vec<Module>,
) -> FileChange {
    FileChange {
        path,
        branch,
        action: FileAction::from_code(&action.action),
        modules,
    }
}

fn module(row: ModuleRow, functions: Vec<FunctionRow>) -> Module {
    Module {
        name: row.name,
        start_line: row.start_line,
        end_line: row.end_line,
        functions: functions
            .into_iter()
            .map(|f| Function {
                header: f.header,
                start_line: f.start_line,
                end_line: f.end_line,
            })
            .collect(),
    }
}

fn is_missing_table(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(NO_SUCH_TABLE),
        _ => false,
    }
}
