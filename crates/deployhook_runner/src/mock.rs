//! Mock command runner for testing.
//!
//! Provides a scriptable implementation of the CommandRunner trait
//! for use in unit tests without touching a real working tree.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandOutput, CommandRunner};

/// Predefined mock response for a command execution.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    /// Real time to wait before answering
    pub delay_ms: u64,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            duration_ms: 10,
            delay_ms: 0,
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration_ms: 10,
            delay_ms: 0,
        }
    }

    pub fn with_duration(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }

    /// Make the call actually take `ms` milliseconds, like a slow command.
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub command: String,
    pub working_directory: PathBuf,
}

/// Mock command runner for testing.
///
/// Responses are chosen in this order:
/// 1. the first rule registered with [`MockRunner::respond_to`] whose pattern
///    is a substring of the command;
/// 2. the next entry of the sequential response queue;
/// 3. an empty success.
///
/// Every call is captured for later assertions.
#[derive(Clone, Default)]
pub struct MockRunner {
    /// Substring-matched responses.
    rules: Arc<RwLock<Vec<(String, MockResponse)>>>,
    /// Sequential responses for commands that match no rule.
    responses: Arc<RwLock<Vec<MockResponse>>>,
    /// Index of next sequential response to return.
    response_index: Arc<AtomicUsize>,
    /// Captured calls for verification.
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    /// Simulated runner failure (the runner itself is unusable).
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl MockRunner {
    /// Create a new mock runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with `response` to every command containing `pattern`.
    pub fn respond_to(self, pattern: impl Into<String>, response: MockResponse) -> Self {
        self.rules.write().push((pattern.into(), response));
        self
    }

    /// Add a sequential response for the next unmatched call.
    pub fn add_response(self, response: MockResponse) -> Self {
        self.responses.write().push(response);
        self
    }

    /// Set multiple sequential responses.
    pub fn with_responses(self, responses: Vec<MockResponse>) -> Self {
        *self.responses.write() = responses;
        self
    }

    /// Make every call fail at the runner level.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Clear all captured calls.
    pub fn clear_calls(&self) {
        self.captured_calls.write().clear();
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the captured command lines, in call order.
    pub fn commands(&self) -> Vec<String> {
        self.captured_calls
            .read()
            .iter()
            .map(|c| c.command.clone())
            .collect()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Check if a command containing `pattern` was run.
    pub fn was_called(&self, pattern: &str) -> bool {
        self.captured_calls
            .read()
            .iter()
            .any(|c| c.command.contains(pattern))
    }

    fn record_call(&self, call: CapturedCall) {
        self.captured_calls.write().push(call);
    }

    fn next_response(&self, command: &str) -> MockResponse {
        if let Some((_, response)) = self
            .rules
            .read()
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
        {
            return response.clone();
        }

        let responses = self.responses.read();
        if responses.is_empty() {
            return MockResponse::success("");
        }
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        responses
            .get(index)
            .cloned()
            .unwrap_or_else(|| MockResponse::success(""))
    }

    fn check_failure(&self) -> RunnerResult<()> {
        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(RunnerError::ExecutionFailed(msg));
        }
        Ok(())
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, command: &str, working_directory: &Path) -> RunnerResult<CommandOutput> {
        self.record_call(CapturedCall {
            command: command.to_string(),
            working_directory: working_directory.to_path_buf(),
        });

        self.check_failure()?;

        let response = self.next_response(command);
        if response.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(response.delay_ms)).await;
        }
        let started_at = Utc::now();
        let finished_at = started_at + chrono::Duration::milliseconds(response.duration_ms as i64);

        Ok(CommandOutput {
            command: command.to_string(),
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: response.stderr,
            started_at,
            finished_at,
            duration_ms: response.duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_runner_basic() {
        let runner = MockRunner::new().add_response(MockResponse::success("test output"));

        let result = runner.run("echo hello", Path::new("/srv/app")).await.unwrap();

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "test output");
    }

    #[tokio::test]
    async fn test_mock_runner_captures_calls() {
        let runner = MockRunner::new();

        let _ = runner.run("git pull origin main", Path::new("/srv/app")).await;

        let calls = runner.get_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].command, "git pull origin main");
        assert_eq!(calls[0].working_directory, PathBuf::from("/srv/app"));
        assert!(runner.was_called("git pull"));
    }

    #[tokio::test]
    async fn test_rules_take_precedence_over_queue() {
        let runner = MockRunner::new()
            .respond_to("rev-parse", MockResponse::success("abc123\n"))
            .add_response(MockResponse::failure(2, "queued"));

        let head = runner.run("git rev-parse HEAD", Path::new(".")).await.unwrap();
        assert_eq!(head.stdout, "abc123\n");

        let other = runner.run("npm ci", Path::new(".")).await.unwrap();
        assert_eq!(other.exit_code, 2);

        // Queue exhausted: default success
        let last = runner.run("npm ci", Path::new(".")).await.unwrap();
        assert!(last.success());
    }

    #[tokio::test]
    async fn test_mock_runner_failure_simulation() {
        let runner = MockRunner::new().simulate_failure("simulated error");

        let result = runner.run("true", Path::new(".")).await;
        assert!(result.is_err());
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_delayed_response_waits() {
        let runner = MockRunner::new().respond_to("migrate", MockResponse::success("").with_delay(50));

        let started = std::time::Instant::now();
        runner.run("php bin/console doctrine:migrations:migrate", Path::new(".")).await.unwrap();
        assert!(started.elapsed() >= std::time::Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_clear_calls() {
        let runner = MockRunner::new();
        let _ = runner.run("true", Path::new(".")).await;
        runner.clear_calls();
        assert_eq!(runner.call_count(), 0);
        assert!(runner.commands().is_empty());
    }
}
