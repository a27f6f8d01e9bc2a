//! Remove command - Unregister a repository.

use std::fs;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use deployhook_core::{CoreError, DeployhookConfig, JsonRegistry, RepositoryStore};

#[derive(Args)]
pub struct RemoveArgs {
    /// Registry name of the repository
    pub name: String,

    /// Also delete the working tree
    #[arg(long)]
    pub purge: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

pub async fn execute(args: RemoveArgs, config: &DeployhookConfig) -> Result<()> {
    let mut registry = JsonRegistry::load(&config.registry_path)
        .context("Failed to load repository registry")?;
    let record = registry
        .get(&args.name)?
        .ok_or_else(|| CoreError::RepositoryNotFound(args.name.clone()))?;

    if !args.yes {
        let question = if args.purge {
            format!(
                "Remove '{}' and delete {}?",
                record.name,
                record.local_path.display()
            )
        } else {
            format!("Remove '{}'?", record.name)
        };
        if !confirm(&question)? {
            println!("Aborted");
            return Ok(());
        }
    }

    registry.remove(&record.name)?;
    info!("Unregistered {}", record.name);

    if args.purge && record.local_path.exists() {
        fs::remove_dir_all(&record.local_path)
            .with_context(|| format!("Failed to delete {}", record.local_path.display()))?;
        println!("🗑️  Deleted {}", record.local_path.display());
    }

    println!("✅ Repository '{}' removed", record.name);
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
