use kesi_core::{EventKind, SourceFamily};
use thiserror::Error;

/// Failure to enumerate a source's pending events. Abandons the run.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("cannot open {database} database: {source}")]
    Connect {
        database: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("summary query failed for {locator}: {source}")]
    Query {
        locator: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Failure to turn one summary into a domain event. Skips that event only.
#[derive(Debug, Error)]
pub enum HydrationError {
    #[error("query for {entity} {id} failed: {source}")]
    Query {
        entity: &'static str,
        id: i64,
        #[source]
        source: sqlx::Error,
    },

    #[error("{entity} {id} not found")]
    Missing { entity: &'static str, id: i64 },

    #[error("{kind} events cannot be read from a {family} store")]
    UnsupportedKind { kind: EventKind, family: SourceFamily },
}

impl HydrationError {
    pub(crate) fn query(entity: &'static str, id: i64) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| HydrationError::Query { entity, id, source }
    }
}
