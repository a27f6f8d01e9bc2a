//! Shell-based command runner.
//!
//! Each command is handed to a fresh `sh -c` process whose working directory
//! is pinned to the repository checkout. stdout and stderr are captured
//! separately; a configured timeout kills the child process.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::ShellConfig;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandOutput, CommandRunner};

/// Runs command lines through a system shell.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    config: ShellConfig,
}

impl ShellRunner {
    /// Create a new runner with the given configuration.
    pub fn new(config: ShellConfig) -> Self {
        Self { config }
    }

    /// Check if dry-run mode is enabled.
    pub fn is_dry_run(&self) -> bool {
        self.config.dry_run
    }

    /// Get the runner configuration.
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    fn build_command(&self, command: &str, working_directory: &Path) -> Command {
        let mut cmd = Command::new(&self.config.shell);
        cmd.arg("-c")
            .arg(command)
            .current_dir(working_directory)
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, working_directory: &Path) -> RunnerResult<CommandOutput> {
        if !working_directory.is_dir() {
            return Err(RunnerError::InvalidWorkingDirectory(
                working_directory.display().to_string(),
            ));
        }

        debug!("Executing in {}: {}", working_directory.display(), command);

        if self.config.dry_run {
            info!("[DRY-RUN] Would execute: {}", command);
            let now = Utc::now();
            return Ok(CommandOutput {
                command: command.to_string(),
                exit_code: 0,
                stdout: format!("[DRY-RUN] Command: {}", command),
                stderr: String::new(),
                started_at: now,
                finished_at: now,
                duration_ms: 0,
            });
        }

        let child = self
            .build_command(command, working_directory)
            .spawn()
            .map_err(|e| {
                RunnerError::SpawnFailed(format!("{} -c {}: {}", self.config.shell, command, e))
            })?;

        let started_at = Utc::now();
        let waited = if self.config.timeout_seconds > 0 {
            let limit = Duration::from_secs(self.config.timeout_seconds);
            match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    // kill_on_drop reaps the child once the future is dropped
                    warn!(
                        "Command timed out after {}s: {}",
                        self.config.timeout_seconds, command
                    );
                    return Err(RunnerError::Timeout(self.config.timeout_seconds));
                }
            }
        } else {
            child.wait_with_output().await
        };
        let output = waited
            .map_err(|e| RunnerError::ExecutionFailed(format!("Failed to wait for process: {}", e)))?;
        let finished_at = Utc::now();

        let exit_code = output.status.code().unwrap_or(-1);
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        debug!(
            "Command exited with code {} after {}ms: {}",
            exit_code, duration_ms, command
        );

        Ok(CommandOutput {
            command: command.to_string(),
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            started_at,
            finished_at,
            duration_ms,
        })
    }
}
