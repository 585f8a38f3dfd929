use std::sync::Arc;

use chrono::{DateTime, Utc};
use kesi_store::ReaderFactory;
use tracing::{debug, info, warn};

use crate::jobs::{EventJob, RunId};
use crate::publisher::EventPublisher;
use crate::queue::{JobReceiver, JobSender, QueueClosed};
use crate::registry::SourceHandle;

/// Producer side of the generation queue.
#[derive(Clone)]
pub struct EventGenerator {
    queue: JobSender<EventJob>,
}

impl EventGenerator {
    pub fn new(queue: JobSender<EventJob>) -> Self {
        Self { queue }
    }

    /// Request events of `source` newer than `since`.
    pub async fn generate(
        &self,
        source: SourceHandle,
        since: DateTime<Utc>,
    ) -> Result<(), QueueClosed> {
        self.queue.submit(EventJob { source, since }).await
    }
}

/// Single consumer of the generation queue; sources are served one at a
/// time in request order.
pub struct GeneratorWorker {
    readers: Arc<dyn ReaderFactory>,
    publisher: EventPublisher,
    next_run: u64,
}

impl GeneratorWorker {
    pub fn new(readers: Arc<dyn ReaderFactory>, publisher: EventPublisher) -> Self {
        Self {
            readers,
            publisher,
            next_run: 0,
        }
    }

    pub async fn run(mut self, mut jobs: JobReceiver<EventJob>) {
        info!("generator started");
        while let Some(job) = jobs.recv().await {
            if let Err(e) = self.generate(job).await {
                warn!(error = %e, "publisher gone, generator stopping");
                break;
            }
        }
        info!(runs = self.next_run, "generator stopped");
    }

    /// One run: summarize, then hydrate and forward each event as it is
    /// ready. Only a closed publication queue is an error here.
    async fn generate(&mut self, job: EventJob) -> Result<(), QueueClosed> {
        self.next_run += 1;
        let run = RunId(self.next_run);
        let locator = job.source.locator();
        let mut reader = self.readers.open(job.source.source());

        let summaries = match reader.summarize(job.since).await {
            Ok(summaries) => summaries,
            Err(e) => {
                warn!(
                    %run,
                    source = %locator,
                    since = %job.since,
                    error = %e,
                    "summarize failed, run abandoned"
                );
                return Ok(());
            }
        };
        info!(
            %run,
            source = %locator,
            since = %job.since,
            pending = summaries.remaining(),
            "generating events"
        );

        let (mut forwarded, mut failed) = (0usize, 0usize);
        for summary in summaries {
            match reader.hydrate(&summary).await {
                Ok(event) => {
                    self.publisher.publish(run, event).await?;
                    forwarded += 1;
                }
                Err(e) => {
                    failed += 1;
                    warn!(
                        %run,
                        source = %locator,
                        kind = %summary.kind,
                        store_id = summary.event_id,
                        error = %e,
                        "hydration failed, event skipped"
                    );
                }
            }
        }

        self.publisher.finish_run(run, locator).await?;
        debug!(%run, source = %locator, forwarded, failed, "run complete");
        Ok(())
    }
}
