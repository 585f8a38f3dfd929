//! Harvesting pipeline: extraction, event generation and publication.
//!
//! Sources enter through the [`intake`], are mined by the external tools
//! of the [`extraction`] stage, turned into domain events by the
//! [`generator`] and put on the bus by the [`publisher`], which is also
//! the only writer of source checkpoints.

pub mod checkpoint;
pub mod command;
pub mod envelope;
pub mod error;
pub mod export;
pub mod extraction;
pub mod generator;
pub mod intake;
pub mod jobs;
pub mod mining;
pub mod pipeline;
pub mod publisher;
pub mod queue;
pub mod registry;
pub mod workspace;

pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use command::{CommandOutput, CommandRunner, ProcessRunner};
pub use envelope::{Envelope, Header};
pub use error::{CheckpointError, CommandError, PipelineError, RegistryError, TransmissionError};
pub use pipeline::{Pipeline, PipelineDeps};
pub use publisher::{EventPublisher, NullPublisher, PublisherStats};
pub use registry::{RegisteredSource, SourceHandle, SourceRegistry};
