//! Error types for the core module.

use deployhook_runner::RunnerError;
use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur during core operations.
///
/// Step failures and compensation failures are not errors: they are recorded
/// in the [`crate::DeploymentOutcome`]. These variants cover what prevents a
/// pipeline from starting at all, plus registry and I/O faults.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown deployment type: {0}")]
    UnknownProfile(String),

    #[error("Repository '{0}' not found")]
    RepositoryNotFound(String),

    #[error("Repository '{0}' already exists")]
    RepositoryExists(String),

    #[error("Cannot capture pre-deployment commit: {0}")]
    AnchorUnavailable(String),

    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(String),

    #[error("Git error: {0}")]
    GitError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
