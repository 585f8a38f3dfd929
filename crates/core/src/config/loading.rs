use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::source::KnowledgeSource;

use super::types::KesiConfig;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

impl KesiConfig {
    /// Parse config from a TOML string, applying `KESI_*` overrides.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Self::from_toml_with(toml_str, |key| std::env::var(key).ok())
    }

    /// Parse config with an explicit override lookup.
    pub fn from_toml_with(
        toml_str: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Knowledge sources described by the `[[sources]]` table.
    pub fn knowledge_sources(&self) -> Vec<KnowledgeSource> {
        self.sources.iter().map(|s| s.to_source()).collect()
    }

    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  database:   host={}:{}, its={}, scm={}",
            self.database.host,
            self.database.port,
            self.database.its_database,
            self.database.scm_database
        );
        tracing::info!(
            "  bus:        endpoint={}, bind={}, sender={}",
            self.bus.endpoint,
            self.bus.bind,
            self.bus.sender
        );
        tracing::info!(
            "  publisher:  debug={}, cap={}, export={}",
            self.publisher.debug,
            self.publisher
                .cap()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "(none)".into()),
            self.publisher
                .export_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".into())
        );
        tracing::info!("  mining:     sources_path={}", self.mining.sources_path.display());
        tracing::info!("  sources:    {}", self.sources.len());
    }

    // ── Environment variable overrides ──────────────────────────────

    /// Apply overrides. Convention: `KESI_SECTION_KEY` overrides `section.key`.
    ///
    /// Unparseable numeric or boolean values are ignored.
    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("KESI_DATABASE_USER") {
            self.database.user = v;
        }
        if let Some(v) = lookup("KESI_DATABASE_PASSWORD") {
            self.database.password = v;
        }
        if let Some(v) = get("KESI_DATABASE_HOST") {
            self.database.host = v;
        }
        if let Some(port) = get("KESI_DATABASE_PORT").and_then(parse::<u16>) {
            self.database.port = port;
        }
        if let Some(v) = get("KESI_BUS_ENDPOINT") {
            self.bus.endpoint = v;
        }
        if let Some(bind) = get("KESI_BUS_BIND").and_then(parse::<bool>) {
            self.bus.bind = bind;
        }
        if let Some(debug) = get("KESI_PUBLISHER_DEBUG").and_then(parse::<bool>) {
            self.publisher.debug = debug;
        }
        if let Some(enabled) = get("KESI_PUBLISHER_LIMIT_ENABLED").and_then(parse::<bool>) {
            self.publisher.limit_enabled = enabled;
        }
        if let Some(max) = get("KESI_PUBLISHER_MAX_MESSAGES").and_then(parse::<u64>) {
            self.publisher.max_messages = max;
        }
        if let Some(v) = get("KESI_PUBLISHER_EXPORT_DIR") {
            self.publisher.export_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("KESI_MINING_SOURCES_PATH") {
            self.mining.sources_path = PathBuf::from(v);
        }
        if let Some(v) = get("KESI_STATE_CHECKPOINTS_PATH") {
            self.state.checkpoints_path = PathBuf::from(v);
        }
        if let Some(v) = get("KESI_LOGGING_LEVEL") {
            self.logging.level = v;
        }
    }
}

fn parse<T: FromStr>(v: String) -> Option<T> {
    v.parse().ok()
}
