mod loading;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use loading::load_dotenv;
pub use types::{
    BusConfig, DatabaseConfig, KesiConfig, LoggingConfig, MiningConfig, PipelineConfig,
    PublisherConfig, SchedulerConfig, SourceConfig, StateConfig,
};
pub use validation::parse_cron;
