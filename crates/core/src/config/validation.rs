use std::collections::HashSet;
use std::str::FromStr;

use cron::Schedule;

use crate::error::ConfigError;

use super::types::{KesiConfig, SchedulerConfig};

impl KesiConfig {
    /// Validate the config for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.queue_capacity must be greater than zero".into(),
            ));
        }
        if self.publisher.limit_enabled && self.publisher.max_messages == 0 {
            return Err(ConfigError::Invalid(
                "publisher.max_messages must be greater than zero when the limit is enabled".into(),
            ));
        }
        if self.bus.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("bus.endpoint is empty".into()));
        }

        let mut ids = HashSet::new();
        let mut uris = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "source '{}' has an empty id",
                    source.uri
                )));
            }
            if source.uri.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "source '{}' has an empty uri",
                    source.id
                )));
            }
            if !ids.insert(source.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source id '{}'",
                    source.id
                )));
            }
            if !uris.insert(source.uri.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source uri '{}'",
                    source.uri
                )));
            }
            if source.password.is_some() && source.user.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "source '{}' has a password but no user",
                    source.id
                )));
            }
        }

        self.scheduler.validate()
    }
}

impl SchedulerConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs.is_some() && self.cron.is_some() {
            return Err(ConfigError::Invalid(
                "scheduler: set either interval_secs or cron, not both".into(),
            ));
        }
        if self.interval_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "scheduler.interval_secs must be greater than zero".into(),
            ));
        }
        self.schedule().map(|_| ())
    }

    /// Parsed cron schedule, if one is configured.
    pub fn schedule(&self) -> Result<Option<Schedule>, ConfigError> {
        self.cron.as_deref().map(parse_cron).transpose()
    }
}

/// Parse a cron expression. Standard 5-field expressions get a leading
/// seconds field so they are accepted by the `cron` crate.
pub fn parse_cron(expr: &str) -> Result<Schedule, ConfigError> {
    let fields = expr.split_whitespace().count();
    let normalized = if fields == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    };
    Schedule::from_str(&normalized).map_err(|e| ConfigError::Cron {
        expr: expr.to_string(),
        reason: e.to_string(),
    })
}
