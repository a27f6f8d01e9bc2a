//! # deployhook_core
//!
//! Deployment orchestration engine for deployhook.
//!
//! This crate decides whether an inbound webhook should trigger a deployment
//! and runs the deployment as a pipeline of steps that is unwound when a step
//! fails.
//!
//! # Architecture
//!
//! - **Admission**: token, event kind and branch filtering of webhook events
//! - **Profiles**: fixed, ordered step lists per project type
//! - **Executor**: runs a profile, tracks compensations on a LIFO stack and
//!   unwinds them, finishing with a hard reset to the pre-deployment commit
//! - **Registry**: JSON file of tracked repositories
//! - **Logger**: append-only, per-repository event log
//! - **Lock**: per-repository advisory file lock held for a whole deployment
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use deployhook_core::{AdmissionGate, Decision, Deployer, FileEventLogger, WebhookEvent};
//! use deployhook_runner::ShellRunner;
//!
//! let logger = Arc::new(FileEventLogger::new("./logs"));
//! let gate = AdmissionGate::new(logger.clone());
//! let deployer = Deployer::new(Arc::new(ShellRunner::default()), logger);
//!
//! let event = WebhookEvent::push(token, "refs/heads/main");
//! if let Decision::Deploy(record) = gate.admit(&event, &repositories) {
//!     let outcome = deployer.deploy(&record).await?;
//!     println!("succeeded: {}", outcome.succeeded);
//! }
//! ```

pub mod admission;
pub mod config;
pub mod deployer;
pub mod error;
pub mod event;
pub mod executor;
pub mod git;
pub mod lock;
pub mod logger;
pub mod profile;
pub mod registry;
pub mod token;

// Re-export main types for convenience
pub use admission::{evaluate, AdmissionGate, Decision, IgnoreReason, RejectReason};
pub use config::{DeployhookConfig, DEFAULT_CONFIG_FILE};
pub use deployer::Deployer;
pub use error::{CoreError, CoreResult};
pub use event::{EventKind, WebhookEvent};
pub use executor::{
    DeploymentExecutor, DeploymentOutcome, PipelineState, RollbackEntry, RollbackKind,
    RollbackResult, RollbackStack, RollbackStatus, StepResult, ANCHOR_RESET,
};
pub use git::GitOps;
pub use lock::{DeployGuard, DeployLocks};
pub use logger::{EventLogger, FileEventLogger, LogLevel, LogRecord, LogScope, MemoryLogger};
pub use profile::{resolve, Action, DeploymentProfile, ProfileType, ResetTarget, StepSpec};
pub use registry::{project_name, JsonRegistry, RegistryFile, RepositoryRecord, RepositoryStore};
pub use token::{generate_token, tokens_match};
