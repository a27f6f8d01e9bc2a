//! Service configuration.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Config file looked up in the current directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "deployhook.toml";

/// deployhook configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployhookConfig {
    /// JSON registry of tracked repositories
    pub registry_path: PathBuf,
    /// Directory of the event log files
    pub log_dir: PathBuf,
    /// Address the webhook server listens on
    pub bind_addr: String,
    /// Per-command timeout in seconds (0 = none)
    pub command_timeout_secs: u64,
    /// Header carrying the webhook token
    pub token_header: String,
    /// Header carrying the event kind
    pub event_header: String,
    /// Log commands instead of running them
    pub dry_run: bool,
}

impl Default for DeployhookConfig {
    fn default() -> Self {
        Self {
            registry_path: PathBuf::from("./repositories.json"),
            log_dir: PathBuf::from("./logs"),
            bind_addr: "0.0.0.0:8080".to_string(),
            command_timeout_secs: 0,
            token_header: "X-Gitlab-Token".to_string(),
            event_header: "X-Gitlab-Event".to_string(),
            dry_run: false,
        }
    }
}

impl DeployhookConfig {
    /// Load a config file. The file must exist.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load the named file, else [`DEFAULT_CONFIG_FILE`] if present, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> CoreResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Directory of the per-repository deployment lock files.
    ///
    /// Lives under the log directory so the server and the CLI, which share
    /// `log_dir`, also share locks.
    pub fn lock_dir(&self) -> PathBuf {
        self.log_dir.join("locks")
    }

    /// Parsed listen address.
    pub fn socket_addr(&self) -> CoreResult<SocketAddr> {
        self.bind_addr
            .parse()
            .map_err(|e| CoreError::Config(format!("Invalid bind address '{}': {}", self.bind_addr, e)))
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.registry_path.as_os_str().is_empty() {
            return Err(CoreError::Config("registry_path must not be empty".to_string()));
        }
        if self.token_header.trim().is_empty() {
            return Err(CoreError::Config("token_header must not be empty".to_string()));
        }
        if self.event_header.trim().is_empty() {
            return Err(CoreError::Config("event_header must not be empty".to_string()));
        }
        self.socket_addr()?;
        Ok(())
    }
}
