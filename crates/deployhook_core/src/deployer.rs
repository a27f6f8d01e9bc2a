//! Deployment entry point used by the server and the CLI.

use std::sync::Arc;

use deployhook_runner::CommandRunner;

use crate::error::CoreResult;
use crate::executor::{DeploymentExecutor, DeploymentOutcome, RollbackStatus};
use crate::logger::{EventLogger, LogScope};
use crate::profile::resolve;
use crate::registry::RepositoryRecord;

/// Resolves a repository's profile and runs it, logging the outcome.
pub struct Deployer {
    executor: DeploymentExecutor,
    logger: Arc<dyn EventLogger>,
}

impl Deployer {
    pub fn new(runner: Arc<dyn CommandRunner>, logger: Arc<dyn EventLogger>) -> Self {
        Self {
            executor: DeploymentExecutor::new(runner, logger.clone()),
            logger,
        }
    }

    /// Deploy `record`.
    ///
    /// An unknown profile type fails before anything runs. Callers must hold
    /// the repository's [`DeployLocks`](crate::DeployLocks) guard for the
    /// whole call.
    pub async fn deploy(&self, record: &RepositoryRecord) -> CoreResult<DeploymentOutcome> {
        let scope = LogScope::repository(&record.name);
        self.logger
            .info(&scope, &format!("Starting deployment for {}", record.name));

        let result = match resolve(&record.profile_type) {
            Ok(profile) => self.executor.execute(&profile, record).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(outcome) if outcome.succeeded => {
                self.logger.info(&scope, "Deployment successful");
            }
            Ok(outcome) => {
                let rollback = match outcome.rollback_status() {
                    RollbackStatus::Complete => "Rollback successful",
                    _ => "Rollback failed",
                };
                self.logger
                    .error(&scope, &format!("Deployment failed: {}", rollback));
            }
            Err(e) => {
                self.logger.error(&scope, &format!("Deployment failed: {}", e));
            }
        }

        result
    }
}
