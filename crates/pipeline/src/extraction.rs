//! Extraction stage: run the mining tool for a source, then hand the
//! source to the generator.
//!
//! Each source family has its own queue and worker, so a slow tracker
//! mining run never delays repository mining.

use std::path::PathBuf;
use std::sync::Arc;

use kesi_core::config::{DatabaseConfig, MiningConfig};
use kesi_core::{KnowledgeSource, SourceFamily};
use tracing::{debug, info, warn};

use crate::command::CommandRunner;
use crate::error::CommandError;
use crate::generator::EventGenerator;
use crate::jobs::ExtractionJob;
use crate::mining;
use crate::queue::{JobReceiver, JobSender, QueueClosed};
use crate::registry::SourceHandle;
use crate::workspace;

/// Producer side of both extraction queues.
#[derive(Clone)]
pub struct ExtractionScheduler {
    its: JobSender<ExtractionJob>,
    scm: JobSender<ExtractionJob>,
}

impl ExtractionScheduler {
    pub fn new(its: JobSender<ExtractionJob>, scm: JobSender<ExtractionJob>) -> Self {
        Self { its, scm }
    }

    /// Queue `source` on its family's worker.
    pub async fn schedule(&self, source: SourceHandle) -> Result<(), QueueClosed> {
        let queue = match source.source().family() {
            SourceFamily::IssueTracker => &self.its,
            SourceFamily::SourceControl => &self.scm,
        };
        debug!(source = %source.locator(), stage = queue.stage(), "extraction queued");
        queue.submit(ExtractionJob { source }).await
    }
}

/// Everything an extraction worker needs besides its queue.
#[derive(Clone)]
pub struct ExtractionContext {
    pub runner: Arc<dyn CommandRunner>,
    pub mining: MiningConfig,
    pub database: DatabaseConfig,
    pub generator: EventGenerator,
}

pub struct ExtractionWorker {
    family: SourceFamily,
    context: ExtractionContext,
}

impl ExtractionWorker {
    pub fn new(family: SourceFamily, context: ExtractionContext) -> Self {
        Self { family, context }
    }

    pub async fn run(self, mut jobs: JobReceiver<ExtractionJob>) {
        info!(family = %self.family, "extraction worker started");
        while let Some(job) = jobs.recv().await {
            let source = job.source;
            match self.extract(source.source()).await {
                Ok(()) => {
                    info!(
                        family = %self.family,
                        source = %source.locator(),
                        "extraction succeeded"
                    );
                    if source.source().startup.publishes() {
                        let since = source.checkpoint();
                        if let Err(e) = self.context.generator.generate(source, since).await {
                            warn!(
                                family = %self.family,
                                error = %e,
                                "generator gone, extraction worker stopping"
                            );
                            break;
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        family = %self.family,
                        source = %source.locator(),
                        error = %e,
                        "extraction failed, source stays stale until next cycle"
                    );
                }
            }
        }
        info!(family = %self.family, "extraction worker stopped");
    }

    /// Prepare the working copy if any, then run the mining tool.
    async fn extract(&self, source: &KnowledgeSource) -> Result<(), CommandError> {
        let ctx = &self.context;
        let working_copy: Option<PathBuf> =
            workspace::prepare(ctx.runner.as_ref(), &ctx.mining, source).await?;

        let argv = match source.family() {
            SourceFamily::IssueTracker => mining::its_command(&ctx.mining, &ctx.database, source),
            SourceFamily::SourceControl => {
                let target = working_copy
                    .as_ref()
                    .map(|dir| dir.display().to_string())
                    .unwrap_or_else(|| source.uri.clone());
                mining::scm_command(&ctx.mining, &ctx.database, &target)
            }
        };
        info!(source = %source.id, command = %mining::redacted(&argv), "running miner");

        let output = ctx.runner.execute(&argv, working_copy.as_deref()).await?;
        debug!(
            source = %source.id,
            stdout = %output.stdout,
            stderr = %output.stderr,
            "miner output"
        );
        if !output.success() {
            warn!(
                source = %source.id,
                exit_code = output.exit_code,
                stderr = %output.stderr_tail(10),
                "miner exited with failure"
            );
            return Err(CommandError::Failed {
                program: argv[0].clone(),
                code: output.exit_code,
            });
        }
        Ok(())
    }
}
