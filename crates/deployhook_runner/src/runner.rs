//! Command runner trait and types.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RunnerResult;

/// Result of a command execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutput {
    /// The command line that was run
    pub command: String,
    /// Exit code of the process (-1 if it was killed by a signal)
    pub exit_code: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Execution start time
    pub started_at: DateTime<Utc>,
    /// Execution end time
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl CommandOutput {
    /// Check if execution was successful (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Get combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        let stdout = self.stdout.trim_end();
        let stderr = self.stderr.trim_end();
        if stdout.is_empty() {
            stderr.to_string()
        } else if stderr.is_empty() {
            stdout.to_string()
        } else {
            format!("{}\n{}", stdout, stderr)
        }
    }
}

/// Capability to execute a shell command inside a working directory.
///
/// Every call is independent: no shell state (cwd, exported variables)
/// carries over from one call to the next.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` with the working directory pinned to `working_directory`.
    ///
    /// Returns `Ok` for any command that ran to completion, whatever its exit code.
    /// `Err` is reserved for failures of the runner itself (spawn failure, timeout).
    async fn run(&self, command: &str, working_directory: &Path) -> RunnerResult<CommandOutput>;
}
