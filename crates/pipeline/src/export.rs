//! Side-channel copy of every attempted transmission.

use std::path::PathBuf;

use crate::envelope::Envelope;
use crate::error::PipelineError;

/// Writes one JSON file per envelope into a directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    dir: PathBuf,
}

impl Exporter {
    /// Create the directory if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| PipelineError::Export {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// `{dir}/{event timestamp}_{event id}_{event kind}`
    pub fn path_for(&self, envelope: &Envelope) -> PathBuf {
        let event = &envelope.event;
        self.dir.join(format!(
            "{}_{}_{}",
            event.timestamp.format("%Y%m%dT%H%M%S%.6fZ"),
            event.id,
            event.kind
        ))
    }

    pub async fn write(&self, envelope: &Envelope) -> std::io::Result<PathBuf> {
        let path = self.path_for(envelope);
        let json = serde_json::to_vec_pretty(envelope)?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }
}
