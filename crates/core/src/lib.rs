pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod source;

pub use config::KesiConfig;
pub use error::ConfigError;
pub use event::{DomainEvent, EventKind, EventPayload, EventSummary};
pub use model::*;
pub use source::{Credentials, KnowledgeSource, SourceFamily, SourceKind, StartupMode, NEVER_SENT};
