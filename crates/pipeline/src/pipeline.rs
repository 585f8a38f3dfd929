//! Wiring of the four stages.
//!
//! ```text
//! intake ─┬─> its extraction ─┐
//!         ├─> scm extraction ─┼─> generation ─> publication ─> bus
//!         └───────────────────┘
//! ```

use std::sync::Arc;

use kesi_bus::{TopicPublisher, Transport, ZmqPublisher};
use kesi_core::{KesiConfig, SourceFamily};
use kesi_store::{MySqlReaderFactory, ReaderFactory};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::checkpoint::{CheckpointStore, FileCheckpointStore};
use crate::command::{CommandRunner, ProcessRunner};
use crate::error::PipelineError;
use crate::export::Exporter;
use crate::extraction::{ExtractionContext, ExtractionScheduler, ExtractionWorker};
use crate::generator::{EventGenerator, GeneratorWorker};
use crate::intake::{Intake, Trigger};
use crate::publisher::{EventPublisher, NullPublisher, PublisherStats, PublisherWorker};
use crate::queue::queue;
use crate::registry::SourceRegistry;

/// External collaborators, injected so tests can substitute doubles.
pub struct PipelineDeps {
    pub readers: Arc<dyn ReaderFactory>,
    pub bus: Arc<dyn TopicPublisher>,
    pub runner: Arc<dyn CommandRunner>,
    pub checkpoints: Arc<dyn CheckpointStore>,
}

impl PipelineDeps {
    /// Production collaborators: ZeroMQ, MySQL, child processes and the
    /// checkpoint file.
    pub async fn from_config(config: &KesiConfig) -> Result<Self, PipelineError> {
        let bus: Arc<dyn TopicPublisher> = if config.publisher.debug {
            Arc::new(NullPublisher)
        } else {
            let transport = Transport::parse(&config.bus.endpoint)?;
            if config.bus.bind {
                Arc::new(ZmqPublisher::bind(&transport).await?)
            } else {
                Arc::new(ZmqPublisher::connect(&transport).await?)
            }
        };
        let readers = MySqlReaderFactory::connect(&config.database).await?;
        let checkpoints = FileCheckpointStore::open(&config.state.checkpoints_path)?;

        Ok(Self {
            readers: Arc::new(readers),
            bus,
            runner: Arc::new(ProcessRunner),
            checkpoints: Arc::new(checkpoints),
        })
    }
}

/// A running pipeline.
pub struct Pipeline {
    intake: Option<Arc<Intake>>,
    shutdown: Arc<Notify>,
    periodic: Option<JoinHandle<()>>,
    extraction: Vec<JoinHandle<()>>,
    generator: JoinHandle<()>,
    publisher: JoinHandle<PublisherStats>,
}

impl Pipeline {
    pub async fn from_config(config: &KesiConfig) -> Result<Self, PipelineError> {
        let deps = PipelineDeps::from_config(config).await?;
        Self::start(config, deps).await
    }

    /// Register the configured sources, spawn one worker per stage and
    /// schedule every source once.
    pub async fn start(config: &KesiConfig, deps: PipelineDeps) -> Result<Self, PipelineError> {
        let registry = Arc::new(SourceRegistry::open(deps.checkpoints)?);
        for source in config.knowledge_sources() {
            registry.register(source)?;
        }
        let exporter = config
            .publisher
            .export_dir
            .as_ref()
            .map(Exporter::create)
            .transpose()?;
        let trigger = Trigger::from_config(&config.scheduler)?;

        let capacity = config.pipeline.queue_capacity;
        let (publication_tx, publication_rx) = queue("publication", capacity);
        let (generation_tx, generation_rx) = queue("generation", capacity);
        let (its_tx, its_rx) = queue("its-extraction", capacity);
        let (scm_tx, scm_rx) = queue("scm-extraction", capacity);

        let publisher = PublisherWorker::new(
            &config.publisher,
            config.bus.sender.clone(),
            Arc::clone(&registry),
            deps.bus,
            exporter,
        );
        let publisher = tokio::spawn(publisher.run(publication_rx));

        let generator = GeneratorWorker::new(deps.readers, EventPublisher::new(publication_tx));
        let generator = tokio::spawn(generator.run(generation_rx));

        let generation = EventGenerator::new(generation_tx);
        let context = ExtractionContext {
            runner: deps.runner,
            mining: config.mining.clone(),
            database: config.database.clone(),
            generator: generation.clone(),
        };
        let its_worker = ExtractionWorker::new(SourceFamily::IssueTracker, context.clone());
        let scm_worker = ExtractionWorker::new(SourceFamily::SourceControl, context);
        let extraction = vec![
            tokio::spawn(its_worker.run(its_rx)),
            tokio::spawn(scm_worker.run(scm_rx)),
        ];

        let intake = Arc::new(Intake::new(
            Arc::clone(&registry),
            ExtractionScheduler::new(its_tx, scm_tx),
            generation,
        ));
        intake.schedule_all().await?;

        let shutdown = Arc::new(Notify::new());
        let periodic = trigger.map(|trigger| {
            let intake = Arc::clone(&intake);
            let shutdown = Arc::clone(&shutdown);
            tokio::spawn(async move { intake.run_periodic(trigger, shutdown).await })
        });

        info!(
            sources = registry.len(),
            capacity,
            periodic = periodic.is_some(),
            "pipeline started"
        );
        Ok(Self {
            intake: Some(intake),
            shutdown,
            periodic,
            extraction,
            generator,
            publisher,
        })
    }

    /// Stop intake, then let each stage drain its queue before the next
    /// one is closed. Returns the publisher's counters.
    pub async fn shutdown(mut self) -> PublisherStats {
        info!("pipeline shutting down");
        self.shutdown.notify_one();
        if let Some(periodic) = self.periodic.take() {
            if let Err(e) = periodic.await {
                error!(error = %e, "periodic scheduler task failed");
            }
        }
        drop(self.intake.take());

        for worker in self.extraction.drain(..) {
            if let Err(e) = worker.await {
                error!(error = %e, "extraction worker failed");
            }
        }
        if let Err(e) = (&mut self.generator).await {
            error!(error = %e, "generator worker failed");
        }
        let stats = match (&mut self.publisher).await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "publisher worker failed");
                PublisherStats::default()
            }
        };
        info!("pipeline stopped");
        stats
    }
}
