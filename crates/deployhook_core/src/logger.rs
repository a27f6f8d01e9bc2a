//! Append-only event log.
//!
//! Operator-facing audit trail of admission decisions and deployments. Every
//! entry is one line, `[YYYY-MM-DD HH:MM:SS] LEVEL: message`, appended to the
//! file of its scope: `app.log` for global events and `<repository>.log` for
//! events that belong to a tracked repository.
//!
//! Entries are mirrored to `tracing` so they also show up in the process log.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::CoreResult;

/// Severity of an event log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Which sink an entry belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogScope {
    /// Events without a resolved repository
    Global,
    /// Events of one tracked repository
    Repository(String),
}

impl LogScope {
    pub fn repository(name: impl Into<String>) -> Self {
        Self::Repository(name.into())
    }

    /// Scope name as shown to operators.
    pub fn name(&self) -> &str {
        match self {
            Self::Global => "global",
            Self::Repository(name) => name,
        }
    }

    /// Log file name of this scope.
    pub fn file_name(&self) -> String {
        match self {
            Self::Global => "app.log".to_string(),
            Self::Repository(name) => format!("{}.log", sanitize(name)),
        }
    }
}

impl From<&str> for LogScope {
    fn from(name: &str) -> Self {
        if name == "global" {
            Self::Global
        } else {
            Self::Repository(name.to_string())
        }
    }
}

impl fmt::Display for LogScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Render one log line (newline included).
pub fn format_line(timestamp: DateTime<Local>, level: LogLevel, message: &str) -> String {
    format!(
        "[{}] {}: {}\n",
        timestamp.format("%Y-%m-%d %H:%M:%S"),
        level,
        message
    )
}

fn mirror(level: LogLevel, scope: &LogScope, message: &str) {
    match level {
        LogLevel::Info => info!(scope = %scope, "{}", message),
        LogLevel::Warning => warn!(scope = %scope, "{}", message),
        LogLevel::Error => error!(scope = %scope, "{}", message),
    }
}

/// Append-only, scoped event sink.
///
/// Implementations must tolerate concurrent calls for distinct scopes, and
/// must never fail the caller: a lost log line is not a deployment failure.
pub trait EventLogger: Send + Sync {
    fn log(&self, level: LogLevel, scope: &LogScope, message: &str);

    fn info(&self, scope: &LogScope, message: &str) {
        self.log(LogLevel::Info, scope, message);
    }

    fn warning(&self, scope: &LogScope, message: &str) {
        self.log(LogLevel::Warning, scope, message);
    }

    fn error(&self, scope: &LogScope, message: &str) {
        self.log(LogLevel::Error, scope, message);
    }
}

/// Event logger writing one file per scope inside a directory.
#[derive(Debug, Clone)]
pub struct FileEventLogger {
    log_dir: PathBuf,
}

impl FileEventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Path of the file backing `scope`.
    pub fn path_for(&self, scope: &LogScope) -> PathBuf {
        self.log_dir.join(scope.file_name())
    }

    fn append(&self, scope: &LogScope, line: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.log_dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(scope))?;
        // One write per line keeps concurrent appends from interleaving.
        file.write_all(line.as_bytes())
    }

    /// Last `lines` non-empty lines of a scope's log, oldest first.
    ///
    /// A scope that has never been written to has no lines.
    pub fn tail(&self, scope: &LogScope, lines: usize) -> CoreResult<Vec<String>> {
        let path = self.path_for(scope);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)?;
        let all: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = all.len().saturating_sub(lines);
        Ok(all[start..].iter().map(|l| l.to_string()).collect())
    }
}

impl EventLogger for FileEventLogger {
    fn log(&self, level: LogLevel, scope: &LogScope, message: &str) {
        mirror(level, scope, message);
        let line = format_line(Local::now(), level, message);
        if let Err(e) = self.append(scope, &line) {
            warn!(
                "Failed to write event log {:?}: {}",
                self.path_for(scope),
                e
            );
        }
    }
}

/// A captured event log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub scope: LogScope,
    pub message: String,
}

/// In-memory event logger for tests.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: RwLock<Vec<LogRecord>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured entries in write order.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.read().clone()
    }

    /// Messages written to `scope`, in write order.
    pub fn messages(&self, scope: &LogScope) -> Vec<String> {
        self.records
            .read()
            .iter()
            .filter(|r| &r.scope == scope)
            .map(|r| r.message.clone())
            .collect()
    }

    /// Check whether any entry contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.records
            .read()
            .iter()
            .any(|r| r.message.contains(needle))
    }
}

impl EventLogger for MemoryLogger {
    fn log(&self, level: LogLevel, scope: &LogScope, message: &str) {
        mirror(level, scope, message);
        self.records.write().push(LogRecord {
            level,
            scope: scope.clone(),
            message: message.to_string(),
        });
    }
}
