//! Shared handler state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use deployhook_core::{
    AdmissionGate, DeployLocks, Deployer, DeployhookConfig, EventLogger, FileEventLogger,
    RegistryFile, RepositoryStore,
};
use deployhook_runner::{CommandRunner, ShellConfig, ShellRunner};

const DEFAULT_TOKEN_HEADER: &str = "X-Gitlab-Token";
const DEFAULT_EVENT_HEADER: &str = "X-Gitlab-Event";

/// State shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RepositoryStore>,
    pub logger: Arc<dyn EventLogger>,
    pub gate: Arc<AdmissionGate>,
    pub deployer: Arc<Deployer>,
    pub locks: DeployLocks,
    pub token_header: String,
    pub event_header: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RepositoryStore>,
        runner: Arc<dyn CommandRunner>,
        logger: Arc<dyn EventLogger>,
        locks: DeployLocks,
    ) -> Self {
        Self {
            store,
            gate: Arc::new(AdmissionGate::new(logger.clone())),
            deployer: Arc::new(Deployer::new(runner, logger.clone())),
            logger,
            locks,
            token_header: DEFAULT_TOKEN_HEADER.to_string(),
            event_header: DEFAULT_EVENT_HEADER.to_string(),
            started_at: Utc::now(),
        }
    }

    pub fn with_headers(mut self, token_header: impl Into<String>, event_header: impl Into<String>) -> Self {
        self.token_header = token_header.into();
        self.event_header = event_header.into();
        self
    }

    /// Production state: registry file, file event log and a real shell.
    pub fn from_config(config: &DeployhookConfig) -> Self {
        let mut shell = ShellConfig::new().timeout(config.command_timeout_secs);
        if config.dry_run {
            shell = shell.dry_run();
        }

        Self::new(
            Arc::new(RegistryFile::new(&config.registry_path)),
            Arc::new(ShellRunner::new(shell)),
            Arc::new(FileEventLogger::new(&config.log_dir)),
            DeployLocks::new(config.lock_dir()),
        )
        .with_headers(&config.token_header, &config.event_header)
    }
}
