//! Publication stage: sequence, envelope, transmit, checkpoint.
//!
//! A single worker consumes [`PublicationJob`]s in order. Checkpoints move
//! per generation run: a delivered event's timestamp is kept *pending*
//! until a strictly later event of the same run is delivered or the run
//! finishes, so a source is never checkpointed into the middle of a group
//! of events sharing one timestamp. The first failed transmission of a run
//! holds the source for the rest of that run.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kesi_bus::{BusError, Message, TopicPublisher};
use kesi_core::config::PublisherConfig;
use kesi_core::DomainEvent;
use tracing::{debug, error, info, warn};

use crate::envelope::Envelope;
use crate::error::TransmissionError;
use crate::export::Exporter;
use crate::jobs::{PublicationJob, RunId};
use crate::queue::{JobReceiver, JobSender, QueueClosed};
use crate::registry::SourceRegistry;

// ── Handle ───────────────────────────────────────────────────────────

/// Producer side of the publication queue.
#[derive(Clone)]
pub struct EventPublisher {
    queue: JobSender<PublicationJob>,
}

impl EventPublisher {
    pub fn new(queue: JobSender<PublicationJob>) -> Self {
        Self { queue }
    }

    pub async fn publish(&self, run: RunId, event: DomainEvent) -> Result<(), QueueClosed> {
        self.queue.submit(PublicationJob::Event { run, event }).await
    }

    /// Mark the end of a run so its last pending checkpoint is written.
    pub async fn finish_run(
        &self,
        run: RunId,
        locator: impl Into<String>,
    ) -> Result<(), QueueClosed> {
        self.queue
            .submit(PublicationJob::RunFinished {
                run,
                locator: locator.into(),
            })
            .await
    }
}

// ── Debug transmitter ────────────────────────────────────────────────

/// Accepts every message without sending it anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPublisher;

#[async_trait]
impl TopicPublisher for NullPublisher {
    async fn publish(&self, message: Message) -> Result<(), BusError> {
        debug!(
            topic = %message.topic,
            event_id = %message.event_id,
            "debug mode, message discarded"
        );
        Ok(())
    }
}

// ── Run progress ─────────────────────────────────────────────────────

#[derive(Debug)]
struct RunProgress {
    locator: String,
    pending: Option<DateTime<Utc>>,
    held: bool,
}

impl RunProgress {
    fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            pending: None,
            held: false,
        }
    }

    /// Record a delivery at `ts`; returns an earlier pending value that is
    /// now safe to write.
    fn delivered(&mut self, ts: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let flush = self.pending.filter(|pending| *pending < ts);
        self.pending = Some(self.pending.map_or(ts, |pending| pending.max(ts)));
        flush
    }

    /// Stop checkpointing this run because the event at `ts` was not
    /// delivered. Returns the pending value if it is strictly earlier.
    fn hold(&mut self, ts: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.held = true;
        self.pending.take().filter(|pending| *pending < ts)
    }

    fn finish(mut self) -> Option<DateTime<Utc>> {
        if self.held {
            None
        } else {
            self.pending.take()
        }
    }
}

// ── Worker ───────────────────────────────────────────────────────────

/// Counters reported when the worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    /// Transmission attempts; equals the last sequence number used.
    pub attempted: u64,
    pub delivered: u64,
    pub failed: u64,
    /// Events not attempted because their run was held or the cap was hit.
    pub skipped: u64,
}

pub struct PublisherWorker {
    registry: Arc<SourceRegistry>,
    bus: Arc<dyn TopicPublisher>,
    sender: String,
    cap: Option<u64>,
    exporter: Option<Exporter>,
    runs: HashMap<RunId, RunProgress>,
    stats: PublisherStats,
}

impl PublisherWorker {
    /// In debug mode `bus` is replaced by a [`NullPublisher`].
    pub fn new(
        config: &PublisherConfig,
        sender: impl Into<String>,
        registry: Arc<SourceRegistry>,
        bus: Arc<dyn TopicPublisher>,
        exporter: Option<Exporter>,
    ) -> Self {
        let bus: Arc<dyn TopicPublisher> = if config.debug {
            info!("publisher in debug mode, nothing is put on the bus");
            Arc::new(NullPublisher)
        } else {
            bus
        };
        Self {
            registry,
            bus,
            sender: sender.into(),
            cap: config.cap(),
            exporter,
            runs: HashMap::new(),
            stats: PublisherStats::default(),
        }
    }

    pub async fn run(mut self, mut jobs: JobReceiver<PublicationJob>) -> PublisherStats {
        info!(cap = ?self.cap, export = self.exporter.is_some(), "publisher started");
        while let Some(job) = jobs.recv().await {
            match job {
                PublicationJob::Event { run, event } => self.handle_event(run, event).await,
                PublicationJob::RunFinished { run, locator } => {
                    self.finish_run(run, &locator).await
                }
            }
        }
        info!(
            attempted = self.stats.attempted,
            delivered = self.stats.delivered,
            failed = self.stats.failed,
            skipped = self.stats.skipped,
            "publisher stopped"
        );
        self.stats
    }

    async fn handle_event(&mut self, run: RunId, event: DomainEvent) {
        let mut progress = self
            .runs
            .remove(&run)
            .unwrap_or_else(|| RunProgress::new(&event.source));

        if progress.held {
            self.stats.skipped += 1;
            debug!(%run, source = %event.source, event_id = %event.id, "run held, event not sent");
        } else if self.cap_reached() {
            self.stats.skipped += 1;
            warn!(
                %run,
                source = %event.source,
                event_id = %event.id,
                cap = ?self.cap,
                "transmission cap reached, holding source"
            );
            if let Some(ts) = progress.hold(event.timestamp) {
                self.advance(&progress.locator, ts).await;
            }
        } else {
            let timestamp = event.timestamp;
            match self.transmit(event).await {
                Ok(()) => {
                    self.stats.delivered += 1;
                    if let Some(ts) = progress.delivered(timestamp) {
                        self.advance(&progress.locator, ts).await;
                    }
                }
                Err(e) => {
                    self.stats.failed += 1;
                    warn!(
                        %run,
                        source = %progress.locator,
                        error = %e,
                        "transmission failed, holding source"
                    );
                    if let Some(ts) = progress.hold(timestamp) {
                        self.advance(&progress.locator, ts).await;
                    }
                }
            }
        }

        self.runs.insert(run, progress);
    }

    async fn transmit(&mut self, event: DomainEvent) -> Result<(), TransmissionError> {
        self.stats.attempted += 1;
        let envelope = Envelope::wrap(&self.sender, self.stats.attempted, event);

        if let Some(exporter) = &self.exporter {
            if let Err(e) = exporter.write(&envelope).await {
                warn!(
                    event_id = %envelope.header.event_id,
                    path = %exporter.path_for(&envelope).display(),
                    error = %e,
                    "export failed"
                );
            }
        }

        let message = Message::new(envelope.topic(), &envelope, envelope.header.event_id)?;
        self.bus.publish(message).await?;
        debug!(
            topic = envelope.topic(),
            sequence = envelope.header.sequence_number,
            event_id = %envelope.header.event_id,
            kind = %envelope.event.kind,
            "event published"
        );
        Ok(())
    }

    async fn finish_run(&mut self, run: RunId, locator: &str) {
        let Some(progress) = self.runs.remove(&run) else {
            debug!(%run, source = %locator, "run finished without events");
            return;
        };
        if let Some(ts) = progress.finish() {
            self.advance(locator, ts).await;
        }
    }

    fn cap_reached(&self) -> bool {
        self.cap.is_some_and(|cap| self.stats.attempted >= cap)
    }

    /// Write a checkpoint, forward only. The store write runs on the
    /// blocking pool.
    async fn advance(&self, locator: &str, ts: DateTime<Utc>) {
        let source = match self.registry.resolve(locator) {
            Ok(source) => source,
            Err(e) => {
                error!(source = %locator, error = %e, "cannot checkpoint event of unknown source");
                return;
            }
        };
        if ts <= source.checkpoint() {
            return;
        }
        let registry = Arc::clone(&self.registry);
        let written =
            tokio::task::spawn_blocking(move || registry.advance_checkpoint(&source, ts)).await;
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(source = %locator, checkpoint = %ts, error = %e, "checkpoint not persisted")
            }
            Err(e) => error!(source = %locator, error = %e, "checkpoint task failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, 3, 1, 12, minute, 0).unwrap()
    }

    #[test]
    fn pending_flushes_on_later_delivery() {
        let mut run = RunProgress::new("s");
        assert_eq!(run.delivered(at(1)), None);
        assert_eq!(run.delivered(at(2)), Some(at(1)));
        assert_eq!(run.finish(), Some(at(2)));
    }

    #[test]
    fn equal_timestamps_stay_pending() {
        let mut run = RunProgress::new("s");
        run.delivered(at(1));
        assert_eq!(run.delivered(at(1)), None);
        assert_eq!(run.hold(at(1)), None);
        assert_eq!(run.finish(), None);
    }

    #[test]
    fn hold_writes_strictly_earlier_pending_only() {
        let mut run = RunProgress::new("s");
        run.delivered(at(1));
        assert_eq!(run.hold(at(2)), Some(at(1)));
        assert!(run.held);
        assert_eq!(run.finish(), None);
    }

    #[test]
    fn empty_run_writes_nothing() {
        assert_eq!(RunProgress::new("s").finish(), None);
    }
}
