//! Logs command - Show the tail of an event log.

use anyhow::{Context, Result};
use clap::Args;

use deployhook_core::{DeployhookConfig, FileEventLogger, LogScope};

#[derive(Args)]
pub struct LogsArgs {
    /// Repository name (global log when omitted)
    pub name: Option<String>,

    /// Number of lines to show
    #[arg(short = 'n', long, default_value_t = 50)]
    pub lines: usize,
}

pub async fn execute(args: LogsArgs, config: &DeployhookConfig) -> Result<()> {
    let scope = args
        .name
        .as_deref()
        .map(LogScope::from)
        .unwrap_or(LogScope::Global);
    let logger = FileEventLogger::new(&config.log_dir);

    let lines = logger
        .tail(&scope, args.lines)
        .with_context(|| format!("Failed to read {}", logger.path_for(&scope).display()))?;

    if lines.is_empty() {
        println!("No log entries for {}", scope);
        return Ok(());
    }

    for line in lines {
        println!("{}", line);
    }
    Ok(())
}
