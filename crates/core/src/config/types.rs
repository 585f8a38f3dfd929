use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::source::{Credentials, KnowledgeSource, SourceKind, StartupMode};

// ── Top-level config ────────────────────────────────────────────────

/// Full configuration for a KESI pipeline instance.
///
/// Parsed from `kesi.toml`, then overridden from `KESI_*` environment
/// variables, then validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KesiConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub publisher: PublisherConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub mining: MiningConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub state: StateConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Knowledge sources to register at startup.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

// ── Section configs ─────────────────────────────────────────────────

/// Backing store connection. The mining tools write to the same server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    #[serde(default = "default_its_database")]
    pub its_database: String,

    #[serde(default = "default_scm_database")]
    pub scm_database: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_db_user() -> String {
    "root".into()
}

fn default_db_host() -> String {
    "localhost".into()
}

fn default_db_port() -> u16 {
    3306
}

fn default_its_database() -> String {
    "its".into()
}

fn default_scm_database() -> String {
    "scm".into()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: default_db_user(),
            password: String::new(),
            host: default_db_host(),
            port: default_db_port(),
            its_database: default_its_database(),
            scm_database: default_scm_database(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl DatabaseConfig {
    /// Connection URL for one of the two databases.
    pub fn url(&self, database: &str) -> String {
        if self.password.is_empty() {
            format!("mysql://{}@{}:{}/{}", self.user, self.host, self.port, database)
        } else {
            format!(
                "mysql://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, database
            )
        }
    }
}

/// Pub/sub bus endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// `tcp://host:port`, `ipc://name` or `ipc:///path/to/name.sock`.
    #[serde(default = "default_bus_endpoint")]
    pub endpoint: String,

    /// Bind the PUB socket instead of connecting to a broker.
    #[serde(default)]
    pub bind: bool,

    /// Sender name written into every envelope header.
    #[serde(default = "default_sender")]
    pub sender: String,
}

fn default_bus_endpoint() -> String {
    "tcp://127.0.0.1:61616".into()
}

fn default_sender() -> String {
    "KESI".into()
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            endpoint: default_bus_endpoint(),
            bind: false,
            sender: default_sender(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Enforce `max_messages` as a hard transmission cap.
    #[serde(default)]
    pub limit_enabled: bool,

    #[serde(default = "default_max_messages")]
    pub max_messages: u64,

    /// Replace the bus with a transmitter that drops everything.
    #[serde(default)]
    pub debug: bool,

    /// Write a copy of every transmitted payload here.
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
}

fn default_max_messages() -> u64 {
    50_000
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            limit_enabled: false,
            max_messages: default_max_messages(),
            debug: false,
            export_dir: None,
        }
    }
}

impl PublisherConfig {
    /// Effective cap, if any.
    pub fn cap(&self) -> Option<u64> {
        self.limit_enabled.then_some(self.max_messages)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Capacity of each stage queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// External mining tools and their working area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    #[serde(default = "default_its_command")]
    pub its_command: String,

    #[serde(default = "default_scm_command")]
    pub scm_command: String,

    #[serde(default = "default_git_command")]
    pub git_command: String,

    /// Parent directory for source-control working copies.
    #[serde(default = "default_sources_path")]
    pub sources_path: PathBuf,
}

fn default_its_command() -> String {
    "bicho".into()
}

fn default_scm_command() -> String {
    "cvsanaly2".into()
}

fn default_git_command() -> String {
    "git".into()
}

fn default_sources_path() -> PathBuf {
    PathBuf::from("/tmp/kesi/sources")
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            its_command: default_its_command(),
            scm_command: default_scm_command(),
            git_command: default_git_command(),
            sources_path: default_sources_path(),
        }
    }
}

/// Periodic re-scheduling. With neither field set, sources are only
/// scheduled once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub interval_secs: Option<u64>,

    /// 5- or 6-field cron expression.
    #[serde(default)]
    pub cron: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// JSON file holding one checkpoint per source.
    #[serde(default = "default_checkpoints_path")]
    pub checkpoints_path: PathBuf,
}

fn default_checkpoints_path() -> PathBuf {
    PathBuf::from("kesi-checkpoints.json")
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            checkpoints_path: default_checkpoints_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// One `[[sources]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub uri: String,
    pub kind: SourceKind,

    #[serde(default)]
    pub on_start: StartupMode,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl SourceConfig {
    pub fn to_source(&self) -> KnowledgeSource {
        let credentials = self.user.as_ref().map(|user| Credentials {
            user: user.clone(),
            password: self.password.clone().unwrap_or_default(),
        });
        KnowledgeSource {
            id: self.id.clone(),
            uri: self.uri.clone(),
            kind: self.kind,
            startup: self.on_start,
            credentials,
        }
    }
}
