//! Step executor with compensating rollback.
//!
//! A run walks `Idle → Running(step) → Succeeded`, or on the first failing
//! step `Running(step) → Unwinding(entry) → Failed`.
//!
//! Before any step runs, the working tree's HEAD is captured as the rollback
//! anchor. Each step that succeeds and declares a compensation pushes a
//! [`RollbackEntry`] onto a LIFO [`RollbackStack`]; the stack therefore always
//! holds the compensations of the successfully applied prefix, in application
//! order. Unwinding pops every entry (a failed compensation does not stop the
//! unwind) and then always finishes with a hard reset to the anchor.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use deployhook_runner::CommandRunner;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::logger::{EventLogger, LogScope};
use crate::profile::{Action, DeploymentProfile, ProfileType, ResetTarget};
use crate::registry::RepositoryRecord;

/// Name recorded for the final reset to the pre-deployment commit.
pub const ANCHOR_RESET: &str = "anchor_reset";

const CAPTURE_HEAD: &str = "git rev-parse HEAD";

/// Pipeline state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum PipelineState {
    /// Nothing has run yet
    #[default]
    Idle,
    /// Running the step at this index
    Running(usize),
    /// Running the rollback entry at this stack position
    Unwinding(usize),
    /// Every step completed
    Succeeded,
    /// A step failed and the unwind has finished
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Result of one forward step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_name: String,
    pub succeeded: bool,
    /// Combined command output, or the reason the step was skipped
    pub output: String,
    /// The step's manifest was absent, so nothing ran
    #[serde(default)]
    pub skipped: bool,
    pub duration_ms: u64,
}

/// Compensation registered by a step that already succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackEntry {
    pub step_name: String,
    pub compensation: Action,
}

impl RollbackEntry {
    pub fn new(step_name: impl Into<String>, compensation: Action) -> Self {
        Self {
            step_name: step_name.into(),
            compensation,
        }
    }
}

/// LIFO stack of rollback entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackStack {
    entries: Vec<RollbackEntry>,
}

impl RollbackStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: RollbackEntry) {
        self.entries.push(entry);
    }

    /// Pop the most recently pushed entry.
    pub fn pop(&mut self) -> Option<RollbackEntry> {
        self.entries.pop()
    }

    /// Entries in push order (bottom of the stack first).
    pub fn entries(&self) -> &[RollbackEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a rollback result undid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackKind {
    /// A step's own compensation
    Compensation,
    /// The final hard reset to the pre-deployment commit
    AnchorReset,
}

/// Result of one rollback action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackResult {
    /// Step that was compensated, or [`ANCHOR_RESET`]
    pub step_name: String,
    pub kind: RollbackKind,
    pub succeeded: bool,
    pub output: String,
}

/// Summary of how well a failed deployment was rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStatus {
    /// The deployment succeeded
    NotNeeded,
    /// Every compensation and the anchor reset succeeded
    Complete,
    /// The anchor reset succeeded but at least one compensation failed
    Partial,
    /// The working tree could not be reset to the pre-deployment commit
    AnchorResetFailed,
}

/// Terminal record of a deployment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentOutcome {
    pub repository: String,
    pub profile_type: ProfileType,
    pub state: PipelineState,
    pub succeeded: bool,
    /// HEAD before the first step ran
    pub pre_deploy_commit: String,
    /// Results of the steps that ran, in execution order
    pub step_results: Vec<StepResult>,
    pub failed_step: Option<String>,
    /// Rollback stack as it stood when unwinding began
    pub rollback_plan: Vec<RollbackEntry>,
    /// Results of the unwind, in execution order
    pub rollback_results: Option<Vec<RollbackResult>>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DeploymentOutcome {
    pub fn rollback_status(&self) -> RollbackStatus {
        let Some(results) = &self.rollback_results else {
            return RollbackStatus::NotNeeded;
        };

        let anchor_ok = results
            .iter()
            .any(|r| r.kind == RollbackKind::AnchorReset && r.succeeded);
        if !anchor_ok {
            return RollbackStatus::AnchorResetFailed;
        }

        if results.iter().all(|r| r.succeeded) {
            RollbackStatus::Complete
        } else {
            RollbackStatus::Partial
        }
    }

    /// Result of the named step, if it ran.
    pub fn step(&self, name: &str) -> Option<&StepResult> {
        self.step_results.iter().find(|r| r.step_name == name)
    }
}

/// Per-run values actions are resolved against.
struct RunContext<'a> {
    working_directory: &'a Path,
    branch: &'a str,
    anchor: &'a str,
    scope: LogScope,
}

struct ActionOutput {
    succeeded: bool,
    skipped: bool,
    output: String,
    duration_ms: u64,
}

/// Runs deployment profiles against a repository's working tree.
pub struct DeploymentExecutor {
    runner: Arc<dyn CommandRunner>,
    logger: Arc<dyn EventLogger>,
}

impl DeploymentExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>, logger: Arc<dyn EventLogger>) -> Self {
        Self { runner, logger }
    }

    /// Run `profile` for `record` and return its terminal outcome.
    ///
    /// Step and compensation failures are part of the outcome. `Err` means
    /// the run could not start: the anchor could not be captured, or the
    /// runner itself is unusable. Nothing has been changed in either case.
    pub async fn execute(
        &self,
        profile: &DeploymentProfile,
        record: &RepositoryRecord,
    ) -> CoreResult<DeploymentOutcome> {
        let started_at = Utc::now();
        let scope = LogScope::repository(&record.name);
        let mut state = PipelineState::Idle;

        let anchor = self.capture_anchor(&record.local_path, &scope).await?;
        let ctx = RunContext {
            working_directory: &record.local_path,
            branch: &record.branch,
            anchor: &anchor,
            scope,
        };

        let mut stack = RollbackStack::new();
        let mut step_results = Vec::with_capacity(profile.steps.len());
        let mut failed_step = None;

        for (index, step) in profile.steps.iter().enumerate() {
            transition(&mut state, PipelineState::Running(index));
            self.logger
                .info(&ctx.scope, &format!("Executing step: {}", step.name));

            let result = self.run_action(&step.forward, &ctx).await;
            step_results.push(StepResult {
                step_name: step.name.clone(),
                succeeded: result.succeeded,
                output: result.output,
                skipped: result.skipped,
                duration_ms: result.duration_ms,
            });

            if !result.succeeded {
                self.logger
                    .error(&ctx.scope, &format!("Step failed: {}", step.name));
                failed_step = Some(step.name.clone());
                break;
            }

            if let Some(compensation) = &step.compensation {
                stack.push(RollbackEntry::new(&step.name, compensation.clone()));
            }
        }

        let (rollback_plan, rollback_results) = if failed_step.is_some() {
            let plan = stack.entries().to_vec();
            let results = self.unwind(&mut state, stack, &ctx).await;
            transition(&mut state, PipelineState::Failed);
            (plan, Some(results))
        } else {
            transition(&mut state, PipelineState::Succeeded);
            (Vec::new(), None)
        };

        Ok(DeploymentOutcome {
            repository: record.name.clone(),
            profile_type: profile.profile_type,
            state,
            succeeded: failed_step.is_none(),
            pre_deploy_commit: anchor.clone(),
            step_results,
            failed_step,
            rollback_plan,
            rollback_results,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn capture_anchor(&self, working_directory: &Path, scope: &LogScope) -> CoreResult<String> {
        let output = self.runner.run(CAPTURE_HEAD, working_directory).await?;
        let commit = output.stdout.trim();

        if !output.success() || commit.is_empty() {
            let message = format!(
                "{} exited with {}: {}",
                CAPTURE_HEAD,
                output.exit_code,
                output.combined_output()
            );
            self.logger.error(scope, &message);
            return Err(CoreError::AnchorUnavailable(message));
        }

        debug!("Captured pre-deploy commit {}", commit);
        Ok(commit.to_string())
    }

    /// Pop and run every rollback entry, then reset to the anchor.
    async fn unwind(
        &self,
        state: &mut PipelineState,
        mut stack: RollbackStack,
        ctx: &RunContext<'_>,
    ) -> Vec<RollbackResult> {
        let mut results = Vec::with_capacity(stack.len() + 1);

        while let Some(entry) = stack.pop() {
            transition(state, PipelineState::Unwinding(stack.len()));
            self.logger
                .info(&ctx.scope, &format!("Rolling back step: {}", entry.step_name));

            let result = self.run_action(&entry.compensation, ctx).await;
            if !result.succeeded {
                self.logger.error(
                    &ctx.scope,
                    &format!("Rollback failed for step {}: {}", entry.step_name, result.output),
                );
            }
            results.push(RollbackResult {
                step_name: entry.step_name,
                kind: RollbackKind::Compensation,
                succeeded: result.succeeded,
                output: result.output,
            });
        }

        self.logger
            .info(&ctx.scope, &format!("Rolling back to commit: {}", ctx.anchor));
        let reset = self.run_action(&Action::reset_to_anchor(), ctx).await;
        if !reset.succeeded {
            self.logger.error(
                &ctx.scope,
                &format!("Reset to {} failed: {}", ctx.anchor, reset.output),
            );
        }
        results.push(RollbackResult {
            step_name: ANCHOR_RESET.to_string(),
            kind: RollbackKind::AnchorReset,
            succeeded: reset.succeeded,
            output: reset.output,
        });

        results
    }

    async fn run_action(&self, action: &Action, ctx: &RunContext<'_>) -> ActionOutput {
        match action {
            Action::Command { command } => self.run_command(command, ctx).await,
            Action::CommandIfPresent { manifest, command } => {
                if ctx.working_directory.join(manifest).exists() {
                    self.run_command(command, ctx).await
                } else {
                    ActionOutput {
                        succeeded: true,
                        skipped: true,
                        output: format!("No {} found", manifest),
                        duration_ms: 0,
                    }
                }
            }
            Action::GitPull => {
                self.run_command(&format!("git pull origin {}", ctx.branch), ctx)
                    .await
            }
            Action::GitReset {
                target: ResetTarget::PreDeployCommit,
            } => {
                self.run_command(&format!("git reset --hard {}", ctx.anchor), ctx)
                    .await
            }
        }
    }

    async fn run_command(&self, command: &str, ctx: &RunContext<'_>) -> ActionOutput {
        self.logger
            .info(&ctx.scope, &format!("Executing: {}", command));
        let start = Instant::now();

        match self.runner.run(command, ctx.working_directory).await {
            Ok(output) => {
                let text = output.combined_output();
                if !output.success() {
                    self.logger.error(
                        &ctx.scope,
                        &format!("Command failed [{}]: {} - {}", output.exit_code, command, text),
                    );
                }
                ActionOutput {
                    succeeded: output.success(),
                    skipped: false,
                    output: text,
                    duration_ms: output.duration_ms,
                }
            }
            // A runner fault mid-run is a failed step, so the unwind still happens.
            Err(e) => {
                self.logger
                    .error(&ctx.scope, &format!("Command failed: {} - {}", command, e));
                ActionOutput {
                    succeeded: false,
                    skipped: false,
                    output: e.to_string(),
                    duration_ms: start.elapsed().as_millis() as u64,
                }
            }
        }
    }
}

fn transition(state: &mut PipelineState, next: PipelineState) {
    debug!("Pipeline state {:?} -> {:?}", state, next);
    *state = next;
}
