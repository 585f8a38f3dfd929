//! External command execution for the mining tools and the VCS client.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::CommandError;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code; -1 when killed by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last few lines of stderr, for log messages.
    pub fn stderr_tail(&self, lines: usize) -> String {
        let all: Vec<&str> = self.stderr.lines().collect();
        all[all.len().saturating_sub(lines)..].join("\n")
    }
}

/// Runs `argv` in `working_dir` and waits for it to exit.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn execute(
        &self,
        argv: &[String],
        working_dir: Option<&Path>,
    ) -> Result<CommandOutput, CommandError>;
}

/// Spawns real child processes. There is no timeout: a stuck tool stalls
/// its extraction worker.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn execute(
        &self,
        argv: &[String],
        working_dir: Option<&Path>,
    ) -> Result<CommandOutput, CommandError> {
        let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }

        debug!(
            program = %program,
            args = args.len(),
            working_dir = ?working_dir.map(|d| d.display().to_string()),
            "spawning command"
        );
        let output = command
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?
            .wait_with_output()
            .await
            .map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;

        let result = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(program = %program, exit_code = result.exit_code, "command finished");
        Ok(result)
    }
}
