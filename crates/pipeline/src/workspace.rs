//! Local working copies for sources whose miner reads from disk.

use std::path::{Path, PathBuf};

use kesi_core::config::MiningConfig;
use kesi_core::KnowledgeSource;
use tracing::{info, warn};

use crate::command::CommandRunner;
use crate::error::CommandError;

/// Directory holding the working copy of `source`.
pub fn working_copy_dir(mining: &MiningConfig, source: &KnowledgeSource) -> PathBuf {
    mining.sources_path.join(&source.id)
}

/// Clone or update the working copy when the source kind needs one.
///
/// Returns the directory the miner should read, or `None` when the miner
/// reads the source URI directly.
pub async fn prepare(
    runner: &dyn CommandRunner,
    mining: &MiningConfig,
    source: &KnowledgeSource,
) -> Result<Option<PathBuf>, CommandError> {
    if !source.kind.needs_working_copy() {
        return Ok(None);
    }
    let dir = working_copy_dir(mining, source);

    let (argv, cwd): (Vec<String>, Option<&Path>) = if dir.join(".git").exists() {
        info!(source = %source.id, dir = %dir.display(), "updating working copy");
        (vec![mining.git_command.clone(), "pull".into()], Some(dir.as_path()))
    } else {
        std::fs::create_dir_all(&mining.sources_path).map_err(|source| {
            CommandError::WorkingCopy {
                path: mining.sources_path.clone(),
                source,
            }
        })?;
        info!(source = %source.id, dir = %dir.display(), "cloning working copy");
        (
            vec![
                mining.git_command.clone(),
                "clone".into(),
                source.uri.clone(),
                dir.display().to_string(),
            ],
            None,
        )
    };

    let output = runner.execute(&argv, cwd).await?;
    if !output.success() {
        warn!(
            source = %source.id,
            exit_code = output.exit_code,
            stderr = %output.stderr_tail(5),
            "working copy preparation failed"
        );
        return Err(CommandError::Failed {
            program: mining.git_command.clone(),
            code: output.exit_code,
        });
    }
    Ok(Some(dir))
}
