use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use kesi_core::{KnowledgeSource, NEVER_SENT};
use tracing::{debug, info};

use crate::checkpoint::CheckpointStore;
use crate::error::{CheckpointError, RegistryError};

/// A registered source and its checkpoint.
///
/// The checkpoint is a single atomic word so readers never observe a torn
/// value. Only the publisher writes it, through
/// [`SourceRegistry::advance_checkpoint`].
#[derive(Debug)]
pub struct RegisteredSource {
    source: KnowledgeSource,
    checkpoint_micros: AtomicI64,
}

pub type SourceHandle = Arc<RegisteredSource>;

impl RegisteredSource {
    fn new(source: KnowledgeSource, checkpoint: DateTime<Utc>) -> Self {
        Self {
            source,
            checkpoint_micros: AtomicI64::new(checkpoint.timestamp_micros()),
        }
    }

    pub fn source(&self) -> &KnowledgeSource {
        &self.source
    }

    pub fn locator(&self) -> &str {
        self.source.locator()
    }

    /// Timestamp of the last event delivered for this source.
    pub fn checkpoint(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.checkpoint_micros.load(Ordering::Acquire))
            .unwrap_or(NEVER_SENT)
    }

    fn set_checkpoint(&self, checkpoint: DateTime<Utc>) {
        self.checkpoint_micros
            .store(checkpoint.timestamp_micros(), Ordering::Release);
    }
}

/// Known knowledge sources, keyed by locator.
pub struct SourceRegistry {
    sources: RwLock<HashMap<String, SourceHandle>>,
    persisted: BTreeMap<String, DateTime<Utc>>,
    store: Arc<dyn CheckpointStore>,
}

impl SourceRegistry {
    /// Create a registry whose sources start from the checkpoints in `store`.
    pub fn open(store: Arc<dyn CheckpointStore>) -> Result<Self, CheckpointError> {
        let persisted = store.load_all()?;
        debug!(checkpoints = persisted.len(), "loaded persisted checkpoints");
        Ok(Self {
            sources: RwLock::new(HashMap::new()),
            persisted,
            store,
        })
    }

    /// Add a source. Its checkpoint is the persisted one, or "never sent".
    pub fn register(&self, source: KnowledgeSource) -> Result<SourceHandle, RegistryError> {
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        if sources.contains_key(source.locator()) {
            return Err(RegistryError::DuplicateSource(source.uri));
        }
        let checkpoint = self
            .persisted
            .get(source.locator())
            .copied()
            .unwrap_or(NEVER_SENT);
        info!(
            source = %source.id,
            locator = %source.uri,
            kind = %source.kind,
            checkpoint = %checkpoint,
            "registered source"
        );
        let handle = Arc::new(RegisteredSource::new(source, checkpoint));
        sources.insert(handle.locator().to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    pub fn resolve(&self, locator: &str) -> Result<SourceHandle, RegistryError> {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(locator)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(locator.to_string()))
    }

    /// All sources, ordered by id.
    pub fn sources(&self) -> Vec<SourceHandle> {
        let mut all: Vec<SourceHandle> = self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.source().id.cmp(&b.source().id));
        all
    }

    pub fn len(&self) -> usize {
        self.sources.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set the checkpoint and persist it.
    ///
    /// No monotonicity check happens here; the caller passes the timestamp
    /// of an event it just delivered.
    pub fn advance_checkpoint(
        &self,
        source: &RegisteredSource,
        checkpoint: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        source.set_checkpoint(checkpoint);
        self.store.store(source.locator(), checkpoint)?;
        debug!(locator = %source.locator(), checkpoint = %checkpoint, "checkpoint advanced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpointStore;
    use chrono::TimeZone;
    use kesi_core::{SourceKind, StartupMode};

    fn jira() -> KnowledgeSource {
        KnowledgeSource::new("jira", "https://issues.example.org/jira", SourceKind::Jira)
    }

    #[test]
    fn new_source_starts_never_sent() {
        let registry = SourceRegistry::open(Arc::new(MemoryCheckpointStore::new())).unwrap();
        let handle = registry.register(jira()).unwrap();
        assert_eq!(handle.checkpoint(), NEVER_SENT);
    }

    #[test]
    fn persisted_checkpoint_is_restored() {
        let ts = Utc.with_ymd_and_hms(2013, 1, 2, 3, 4, 5).unwrap();
        let store = MemoryCheckpointStore::with([(jira().uri, ts)]);
        let registry = SourceRegistry::open(Arc::new(store)).unwrap();
        assert_eq!(registry.register(jira()).unwrap().checkpoint(), ts);
    }

    #[test]
    fn duplicate_locator_is_rejected_and_entry_kept() {
        let registry = SourceRegistry::open(Arc::new(MemoryCheckpointStore::new())).unwrap();
        registry.register(jira()).unwrap();

        let again = KnowledgeSource::new("other-id", jira().uri, SourceKind::Bugzilla)
            .with_startup(StartupMode::Publish);
        let err = registry.register(again).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateSource(l) if l == jira().uri));

        let kept = registry.resolve(&jira().uri).unwrap();
        assert_eq!(kept.source(), &jira());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resolve_unknown_locator() {
        let registry = SourceRegistry::open(Arc::new(MemoryCheckpointStore::new())).unwrap();
        assert!(matches!(
            registry.resolve("https://nowhere"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn advance_sets_and_persists() {
        let store = Arc::new(MemoryCheckpointStore::new());
        let registry = SourceRegistry::open(store.clone()).unwrap();
        let handle = registry.register(jira()).unwrap();
        let ts = Utc.with_ymd_and_hms(2013, 1, 2, 3, 4, 5).unwrap();

        registry.advance_checkpoint(&handle, ts).unwrap();

        assert_eq!(handle.checkpoint(), ts);
        assert_eq!(registry.resolve(&jira().uri).unwrap().checkpoint(), ts);
        assert_eq!(store.get(&jira().uri), Some(ts));
    }
}
