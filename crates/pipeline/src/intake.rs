//! Intake: decides where each source enters the pipeline, at start-up and
//! on every scheduler tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use kesi_core::config::SchedulerConfig;
use kesi_core::ConfigError;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::extraction::ExtractionScheduler;
use crate::generator::EventGenerator;
use crate::queue::QueueClosed;
use crate::registry::{SourceHandle, SourceRegistry};

/// When the intake re-submits every source.
#[derive(Debug, Clone)]
pub enum Trigger {
    Interval(Duration),
    Cron(Schedule),
}

impl Trigger {
    /// `None` when no rescheduling is configured.
    pub fn from_config(config: &SchedulerConfig) -> Result<Option<Self>, ConfigError> {
        if let Some(schedule) = config.schedule()? {
            return Ok(Some(Trigger::Cron(schedule)));
        }
        Ok(config
            .interval_secs
            .map(|secs| Trigger::Interval(Duration::from_secs(secs))))
    }

    /// Time until the next tick; `None` when a cron schedule has no
    /// further fire time.
    pub fn next_delay(&self) -> Option<Duration> {
        match self {
            Trigger::Interval(every) => Some(*every),
            Trigger::Cron(schedule) => {
                let next = schedule.upcoming(Utc).next()?;
                Some((next - Utc::now()).to_std().unwrap_or(Duration::ZERO))
            }
        }
    }
}

pub struct Intake {
    registry: Arc<SourceRegistry>,
    extraction: ExtractionScheduler,
    generator: EventGenerator,
}

impl Intake {
    pub fn new(
        registry: Arc<SourceRegistry>,
        extraction: ExtractionScheduler,
        generator: EventGenerator,
    ) -> Self {
        Self {
            registry,
            extraction,
            generator,
        }
    }

    /// Extracting sources go to their extraction queue; publish-only
    /// sources go straight to generation from their checkpoint.
    pub async fn schedule_source(&self, source: SourceHandle) -> Result<(), QueueClosed> {
        let startup = source.source().startup;
        if startup.extracts() {
            self.extraction.schedule(source).await
        } else {
            let since = source.checkpoint();
            debug!(
                source = %source.locator(),
                since = %since,
                "publish-only source, skipping extraction"
            );
            self.generator.generate(source, since).await
        }
    }

    /// Schedule every registered source; returns how many were queued.
    pub async fn schedule_all(&self) -> Result<usize, QueueClosed> {
        let sources = self.registry.sources();
        let count = sources.len();
        for source in sources {
            self.schedule_source(source).await?;
        }
        info!(sources = count, "sources scheduled");
        Ok(count)
    }

    /// Re-schedule all sources on every tick until `shutdown` is notified.
    pub async fn run_periodic(&self, trigger: Trigger, shutdown: Arc<Notify>) {
        info!(trigger = ?trigger, "periodic scheduling started");
        loop {
            let Some(delay) = trigger.next_delay() else {
                info!("schedule has no further fire times");
                break;
            };
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = self.schedule_all().await {
                        warn!(error = %e, "pipeline closed, periodic scheduling stopped");
                        break;
                    }
                }
                _ = shutdown.notified() => break,
            }
        }
        info!("periodic scheduling stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_scheduler_means_no_trigger() {
        assert!(Trigger::from_config(&SchedulerConfig::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn interval_trigger() {
        let config = SchedulerConfig {
            interval_secs: Some(60),
            cron: None,
        };
        let trigger = Trigger::from_config(&config).unwrap().unwrap();
        assert_eq!(trigger.next_delay(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn cron_trigger_fires_within_its_period() {
        let config = SchedulerConfig {
            interval_secs: None,
            cron: Some("*/5 * * * *".into()),
        };
        let trigger = Trigger::from_config(&config).unwrap().unwrap();
        assert!(matches!(trigger, Trigger::Cron(_)));
        assert!(trigger.next_delay().unwrap() <= Duration::from_secs(300));
    }
}
