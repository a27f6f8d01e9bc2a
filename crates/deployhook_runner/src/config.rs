//! Shell runner configuration types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::ShellRunner`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Shell used to interpret command lines (invoked as `<shell> -c <command>`)
    pub shell: String,
    /// Timeout in seconds (0 = no timeout)
    pub timeout_seconds: u64,
    /// Extra environment variables set on every command
    pub env: HashMap<String, String>,
    /// Dry-run mode (log commands without executing)
    pub dry_run: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            timeout_seconds: 0,
            env: HashMap::new(),
            dry_run: false,
        }
    }
}

impl ShellConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}
