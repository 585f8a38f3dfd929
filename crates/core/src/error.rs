use thiserror::Error;

/// Configuration problems. Any of these aborts startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid cron expression '{expr}': {reason}")]
    Cron { expr: String, reason: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}
