#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use kesi_bus::{BusError, Message, TopicPublisher};
use kesi_core::event::event_uuid;
use kesi_core::{
    Commit, DomainEvent, EventKind, EventPayload, EventSummary, Issue, IssueTracker, IssueUpdate,
    KesiConfig, KnowledgeSource,
};
use kesi_pipeline::{
    CommandError, CommandOutput, CommandRunner, Envelope, MemoryCheckpointStore, PipelineDeps,
};
use kesi_store::{EventReader, ExtractionError, HydrationError, ReaderFactory, SummarySet};
use uuid::Uuid;

pub const JIRA: &str = "https://issues.example.org/jira";
pub const REPO: &str = "https://git.example.org/kesi.git";

pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2013, 4, 1, 9, minute, 0).unwrap()
}

pub fn summary(event_id: i64, kind: EventKind, ts: DateTime<Utc>) -> EventSummary {
    EventSummary {
        event_id,
        kind,
        key: 100 + event_id,
        timestamp: ts,
    }
}

pub fn id_of(locator: &str, summary: &EventSummary) -> Uuid {
    event_uuid(locator, summary.kind, summary.event_id)
}

/// Config with the given `[[sources]]` TOML and no environment overrides.
pub fn config(extra: &str) -> KesiConfig {
    KesiConfig::from_toml_with(extra, |_| None).unwrap()
}

// ── Readers ──────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct Script {
    pub summaries: Vec<EventSummary>,
    pub failing: HashSet<i64>,
    pub summarize_fails: bool,
}

/// Serves scripted summaries per locator and records every `summarize`.
#[derive(Default)]
pub struct ScriptedReaders {
    scripts: Mutex<HashMap<String, Script>>,
    pub summarized: Arc<Mutex<Vec<(String, DateTime<Utc>)>>>,
    pub hydrated: Arc<Mutex<Vec<EventSummary>>>,
}

impl ScriptedReaders {
    pub fn with(locator: &str, script: Script) -> Self {
        let readers = Self::default();
        readers.set(locator, script);
        readers
    }

    /// Readers answering `summaries` for `locator` and nothing else.
    pub fn serving(locator: &str, summaries: Vec<EventSummary>) -> Self {
        Self::with(
            locator,
            Script {
                summaries,
                ..Script::default()
            },
        )
    }

    pub fn set(&self, locator: &str, script: Script) {
        self.scripts.lock().unwrap().insert(locator.to_string(), script);
    }

    pub fn summarized(&self) -> Vec<(String, DateTime<Utc>)> {
        self.summarized.lock().unwrap().clone()
    }
}

impl ReaderFactory for ScriptedReaders {
    fn open(&self, source: &KnowledgeSource) -> Box<dyn EventReader> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(source.locator())
            .cloned()
            .unwrap_or_default();
        Box::new(ScriptedReader {
            locator: source.locator().to_string(),
            script,
            summarized: Arc::clone(&self.summarized),
            hydrated: Arc::clone(&self.hydrated),
        })
    }
}

struct ScriptedReader {
    locator: String,
    script: Script,
    summarized: Arc<Mutex<Vec<(String, DateTime<Utc>)>>>,
    hydrated: Arc<Mutex<Vec<EventSummary>>>,
}

#[async_trait]
impl EventReader for ScriptedReader {
    async fn summarize(&mut self, since: DateTime<Utc>) -> Result<SummarySet, ExtractionError> {
        self.summarized
            .lock()
            .unwrap()
            .push((self.locator.clone(), since));
        if self.script.summarize_fails {
            return Err(ExtractionError::Query {
                locator: self.locator.clone(),
                source: sqlx::Error::PoolTimedOut,
            });
        }
        Ok(SummarySet::new(since, self.script.summaries.clone()))
    }

    async fn hydrate(&mut self, summary: &EventSummary) -> Result<DomainEvent, HydrationError> {
        self.hydrated.lock().unwrap().push(summary.clone());
        if self.script.failing.contains(&summary.event_id) {
            return Err(HydrationError::Missing {
                entity: "issue",
                id: summary.key,
            });
        }
        let payload = match summary.kind {
            EventKind::NewCommit => EventPayload::Commit(Commit {
                id: summary.key,
                repository: Some(self.locator.clone()),
                revision: format!("r{}", summary.key),
                message: "fix build".into(),
                date: summary.timestamp,
                author: None,
                committer: None,
                files: Vec::new(),
            }),
            _ => {
                let tracker = IssueTracker {
                    url: self.locator.clone(),
                    name: "jira".into(),
                };
                let update = if summary.kind == EventKind::NewIssue {
                    IssueUpdate::New
                } else {
                    IssueUpdate::Update
                };
                EventPayload::Issue(Issue::new(tracker, format!("KESI-{}", summary.key), update))
            }
        };
        Ok(DomainEvent::new(&self.locator, summary, payload))
    }
}

// ── Bus ──────────────────────────────────────────────────────────────

/// Records published messages; fails for the listed event ids.
#[derive(Default)]
pub struct RecordingBus {
    messages: Mutex<Vec<Message>>,
    failing: Mutex<HashSet<Uuid>>,
}

impl RecordingBus {
    pub fn failing(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            failing: Mutex::new(ids.into_iter().collect()),
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    pub fn envelopes(&self) -> Vec<Envelope> {
        self.messages()
            .iter()
            .map(|m| m.decode::<Envelope>().unwrap())
            .collect()
    }
}

#[async_trait]
impl TopicPublisher for RecordingBus {
    async fn publish(&self, message: Message) -> Result<(), BusError> {
        if self.failing.lock().unwrap().contains(&message.event_id) {
            return Err(BusError::Transport("broker unreachable".into()));
        }
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

// ── Commands ─────────────────────────────────────────────────────────

/// Records argv of every command and answers with a fixed exit code.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Vec<String>>>,
    pub exit_code: i32,
}

impl RecordingRunner {
    pub fn exiting(exit_code: i32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            exit_code,
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn execute(
        &self,
        argv: &[String],
        _working_dir: Option<&Path>,
    ) -> Result<CommandOutput, CommandError> {
        self.calls.lock().unwrap().push(argv.to_vec());
        Ok(CommandOutput {
            exit_code: self.exit_code,
            ..CommandOutput::default()
        })
    }
}

// ── Wiring ───────────────────────────────────────────────────────────

pub struct Doubles {
    pub readers: Arc<ScriptedReaders>,
    pub bus: Arc<RecordingBus>,
    pub runner: Arc<RecordingRunner>,
    pub checkpoints: Arc<MemoryCheckpointStore>,
}

impl Doubles {
    pub fn new(
        readers: ScriptedReaders,
        bus: RecordingBus,
        checkpoints: MemoryCheckpointStore,
    ) -> Self {
        Self {
            readers: Arc::new(readers),
            bus: Arc::new(bus),
            runner: Arc::new(RecordingRunner::default()),
            checkpoints: Arc::new(checkpoints),
        }
    }

    pub fn deps(&self) -> PipelineDeps {
        PipelineDeps {
            readers: self.readers.clone(),
            bus: self.bus.clone(),
            runner: self.runner.clone(),
            checkpoints: self.checkpoints.clone(),
        }
    }
}
