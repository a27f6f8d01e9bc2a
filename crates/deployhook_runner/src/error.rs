//! Error types for the runner module.

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while running a command.
///
/// A command that runs and exits non-zero is *not* an error at this level;
/// it is reported through [`crate::CommandOutput::exit_code`].
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to spawn command: {0}")]
    SpawnFailed(String),

    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Command timeout after {0} seconds")]
    Timeout(u64),

    #[error("Invalid working directory: {0}")]
    InvalidWorkingDirectory(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
