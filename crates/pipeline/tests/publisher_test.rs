mod common;

use std::sync::Arc;

use common::*;
use kesi_core::EventKind;
use kesi_pipeline::{
    CheckpointStore, Envelope, FileCheckpointStore, MemoryCheckpointStore, Pipeline, PipelineDeps,
};

fn publish_only(publisher: &str) -> String {
    format!(
        r#"
[publisher]
{publisher}

[[sources]]
id = "jira"
uri = "{JIRA}"
kind = "jira"
on_start = "publish"
"#
    )
}

fn three_events() -> Vec<kesi_core::EventSummary> {
    vec![
        summary(1, EventKind::NewIssue, at(1)),
        summary(2, EventKind::IssueComment, at(2)),
        summary(3, EventKind::IssueChange, at(3)),
    ]
}

#[tokio::test]
async fn cap_stops_transmission_and_holds_the_source() {
    let doubles = Doubles::new(
        ScriptedReaders::serving(JIRA, three_events()),
        RecordingBus::default(),
        MemoryCheckpointStore::new(),
    );
    let config = config(&publish_only("limit_enabled = true\nmax_messages = 2"));

    let pipeline = Pipeline::start(&config, doubles.deps()).await.unwrap();
    let stats = pipeline.shutdown().await;

    assert_eq!(doubles.bus.messages().len(), 2);
    assert_eq!((stats.attempted, stats.skipped), (2, 1));
    // the third event was not sent, so the checkpoint stops at the second
    assert_eq!(doubles.checkpoints.get(JIRA), Some(at(2)));
}

#[tokio::test]
async fn debug_mode_advances_checkpoints_without_the_bus() {
    let doubles = Doubles::new(
        ScriptedReaders::serving(JIRA, three_events()),
        RecordingBus::default(),
        MemoryCheckpointStore::new(),
    );
    let config = config(&publish_only("debug = true"));

    let pipeline = Pipeline::start(&config, doubles.deps()).await.unwrap();
    let stats = pipeline.shutdown().await;

    assert!(doubles.bus.messages().is_empty());
    assert_eq!(stats.delivered, 3);
    assert_eq!(doubles.checkpoints.get(JIRA), Some(at(3)));
}

#[tokio::test]
async fn export_writes_every_attempt_even_when_the_bus_fails() {
    let dir = tempfile::tempdir().unwrap();
    let export_dir = dir.path().join("export");
    let events = three_events();
    let doubles = Doubles::new(
        ScriptedReaders::serving(JIRA, events.clone()),
        RecordingBus::failing([id_of(JIRA, &events[1])]),
        MemoryCheckpointStore::new(),
    );
    let config = config(&publish_only(&format!(
        "export_dir = \"{}\"",
        export_dir.display()
    )));

    let pipeline = Pipeline::start(&config, doubles.deps()).await.unwrap();
    pipeline.shutdown().await;

    let mut names: Vec<String> = std::fs::read_dir(&export_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names.len(), 2);
    assert!(names[0].starts_with("20130401T090100"));
    assert!(names[0].ends_with(&format!("_{}_new-issue", id_of(JIRA, &events[0]))));
    assert!(names[1].ends_with(&format!("_{}_issue-comment", id_of(JIRA, &events[1]))));

    let failed: Envelope =
        serde_json::from_slice(&std::fs::read(export_dir.join(&names[1])).unwrap()).unwrap();
    assert_eq!(failed.header.sequence_number, 2);
    assert_eq!(failed.event.kind, EventKind::IssueComment);
}

#[tokio::test]
async fn delivered_checkpoints_are_written_to_the_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("checkpoints.json");
    let doubles = Doubles::new(
        ScriptedReaders::serving(JIRA, three_events()),
        RecordingBus::default(),
        MemoryCheckpointStore::new(),
    );
    let deps = PipelineDeps {
        checkpoints: Arc::new(FileCheckpointStore::open(&path).unwrap()),
        ..doubles.deps()
    };

    let pipeline = Pipeline::start(&config(&publish_only("")), deps).await.unwrap();
    let stats = pipeline.shutdown().await;

    assert_eq!(stats.delivered, 3);
    let persisted = FileCheckpointStore::open(&path).unwrap().load_all().unwrap();
    assert_eq!(persisted.get(JIRA), Some(&at(3)));
}

#[tokio::test]
async fn sequence_numbers_span_sources() {
    let toml = format!(
        r#"
[[sources]]
id = "jira"
uri = "{JIRA}"
kind = "jira"
on_start = "publish"

[[sources]]
id = "kesi"
uri = "{REPO}"
kind = "git"
on_start = "publish"
"#
    );
    let readers = ScriptedReaders::with(
        JIRA,
        Script {
            summaries: three_events(),
            ..Script::default()
        },
    );
    readers.set(
        REPO,
        Script {
            summaries: vec![summary(9, EventKind::NewCommit, at(0))],
            ..Script::default()
        },
    );
    let doubles = Doubles::new(readers, RecordingBus::default(), MemoryCheckpointStore::new());

    let pipeline = Pipeline::start(&config(&toml), doubles.deps()).await.unwrap();
    pipeline.shutdown().await;

    let sequences: Vec<u64> = doubles
        .bus
        .envelopes()
        .iter()
        .map(|e| e.header.sequence_number)
        .collect();
    assert_eq!(sequences, [1, 2, 3, 4]);
    assert_eq!(doubles.checkpoints.get(JIRA), Some(at(3)));
    assert_eq!(doubles.checkpoints.get(REPO), Some(at(0)));
}
