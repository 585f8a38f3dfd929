use std::path::PathBuf;

use kesi_bus::BusError;
use kesi_core::ConfigError;
use kesi_store::ExtractionError;
use thiserror::Error;

use crate::queue::QueueClosed;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("source already registered: {0}")]
    DuplicateSource(String),

    #[error("unknown source: {0}")]
    NotFound(String),

    #[error("checkpoint not persisted: {0}")]
    Persist(#[from] CheckpointError),
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint file {path} is malformed: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure of an external command (mining tool or VCS client).
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("empty command line")]
    Empty,

    #[error("cannot run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with code {code}")]
    Failed { program: String, code: i32 },

    #[error("cannot prepare working copy {path}: {source}")]
    WorkingCopy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single event could not be put on the bus.
#[derive(Debug, Error)]
pub enum TransmissionError {
    #[error("cannot encode envelope: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Setup failures. Any of these stops the process.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("bus setup failed: {0}")]
    Bus(#[from] BusError),

    #[error("backing store setup failed: {0}")]
    Store(#[from] ExtractionError),

    #[error("checkpoint store setup failed: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("source registration failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("initial scheduling failed: {0}")]
    Queue(#[from] QueueClosed),

    #[error("export directory {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
