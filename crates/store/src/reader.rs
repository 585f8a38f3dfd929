use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kesi_core::config::DatabaseConfig;
use kesi_core::{DomainEvent, EventSummary, KnowledgeSource, SourceFamily};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use tracing::{info, warn};

use crate::error::{ExtractionError, HydrationError};
use crate::its::{Dialect, ItsReader};
use crate::scm::ScmReader;
use crate::summary::SummarySet;

/// The summary-then-hydrate protocol over a backing store.
#[async_trait]
pub trait EventReader: Send {
    /// Pending events strictly newer than `since`, oldest first.
    async fn summarize(&mut self, since: DateTime<Utc>) -> Result<SummarySet, ExtractionError>;

    /// Build the full event a summary points at.
    async fn hydrate(&mut self, summary: &EventSummary) -> Result<DomainEvent, HydrationError>;
}

/// Opens a fresh reader for each generation run.
pub trait ReaderFactory: Send + Sync {
    fn open(&self, source: &KnowledgeSource) -> Box<dyn EventReader>;
}

/// Backing-store reader for one source, by family.
pub enum Reader {
    Its(ItsReader),
    Scm(ScmReader),
}

#[async_trait]
impl EventReader for Reader {
    async fn summarize(&mut self, since: DateTime<Utc>) -> Result<SummarySet, ExtractionError> {
        match self {
            Reader::Its(reader) => reader.summarize(since).await,
            Reader::Scm(reader) => reader.summarize(since).await,
        }
    }

    async fn hydrate(&mut self, summary: &EventSummary) -> Result<DomainEvent, HydrationError> {
        match self {
            Reader::Its(reader) => reader.hydrate(summary).await,
            Reader::Scm(reader) => reader.hydrate(summary).await,
        }
    }
}

/// Connection pools for the two mining databases.
#[derive(Clone)]
pub struct MySqlReaderFactory {
    its: MySqlPool,
    scm: MySqlPool,
}

impl MySqlReaderFactory {
    pub fn new(its: MySqlPool, scm: MySqlPool) -> Self {
        Self { its, scm }
    }

    /// Create both pools. An unreachable server is logged and the pool
    /// is created lazily, so the failure surfaces per run instead.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, ExtractionError> {
        let its = open_pool(config, &config.its_database).await?;
        let scm = open_pool(config, &config.scm_database).await?;
        Ok(Self { its, scm })
    }

    pub fn reader(&self, source: &KnowledgeSource) -> Reader {
        match (source.family(), Dialect::for_kind(source.kind)) {
            (SourceFamily::IssueTracker, Some(dialect)) => {
                Reader::Its(ItsReader::new(self.its.clone(), source.locator(), dialect))
            }
            _ => Reader::Scm(ScmReader::new(self.scm.clone(), source.locator())),
        }
    }
}

impl ReaderFactory for MySqlReaderFactory {
    fn open(&self, source: &KnowledgeSource) -> Box<dyn EventReader> {
        Box::new(self.reader(source))
    }
}

async fn open_pool(config: &DatabaseConfig, database: &str) -> Result<MySqlPool, ExtractionError> {
    let url = config.url(database);
    let options = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs));

    match options.clone().connect(&url).await {
        Ok(pool) => {
            info!(database, host = %config.host, "connected to backing store");
            Ok(pool)
        }
        Err(e) => {
            warn!(
                database,
                host = %config.host,
                error = %e,
                "backing store unreachable, connecting lazily"
            );
            options
                .connect_lazy(&url)
                .map_err(|source| ExtractionError::Connect {
                    database: database.to_string(),
                    source,
                })
        }
    }
}
