//! Install command - Clone and register a repository.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use deployhook_core::{
    generate_token, project_name, CoreError, DeployhookConfig, EventLogger, FileEventLogger,
    GitOps, JsonRegistry, LogScope, ProfileType, RepositoryRecord,
};

#[derive(Args)]
pub struct InstallArgs {
    /// Clone URL of the repository
    pub git_url: String,

    /// Working tree to deploy into
    pub local_path: PathBuf,

    /// Branch whose pushes and merges trigger a deployment
    #[arg(short, long, default_value = "main")]
    pub branch: String,

    /// Deployment profile (see `deployhook profiles`)
    #[arg(short = 't', long = "type", default_value = "symfony-webpack")]
    pub profile_type: String,

    /// Registry name (derived from the URL by default)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Register an existing working tree instead of cloning
    #[arg(long)]
    pub no_clone: bool,
}

pub async fn execute(args: InstallArgs, config: &DeployhookConfig) -> Result<()> {
    let profile: ProfileType = args.profile_type.parse()?;
    let local_path = std::path::absolute(&args.local_path)
        .with_context(|| format!("Invalid path {}", args.local_path.display()))?;

    let name = match args.name {
        Some(name) => name,
        None => project_name(&args.git_url, &local_path)
            .context("Cannot derive a repository name, use --name")?,
    };

    let mut registry = JsonRegistry::load(&config.registry_path)
        .context("Failed to load repository registry")?;
    if registry.contains(&name) {
        return Err(CoreError::RepositoryExists(name).into());
    }

    if args.no_clone {
        if !local_path.is_dir() {
            anyhow::bail!("Working tree not found: {}", local_path.display());
        }
    } else {
        println!("📥 Cloning {} into {}...", args.git_url, local_path.display());
        GitOps::clone_repository(&args.git_url, &local_path, &args.branch)
            .context("Failed to clone repository")?;
    }

    let record = RepositoryRecord::new(
        &name,
        &args.git_url,
        &local_path,
        &args.branch,
        profile.as_str(),
        generate_token(),
    );
    let token = record.webhook_token.clone();
    registry.add(record).context("Failed to save repository registry")?;

    info!("Registered {} ({})", name, profile);
    FileEventLogger::new(&config.log_dir).info(
        &LogScope::repository(&name),
        &format!("Repository installed: {} ({}, branch {})", name, profile, args.branch),
    );

    println!("✅ Repository '{}' installed", name);
    println!();
    println!("GitLab webhook setup (Settings → Webhooks):");
    println!("  URL:           http://<this-host>:{}/webhook", port(&config.bind_addr));
    println!("  Secret token:  {}", token);
    println!("  Triggers:      Push events, Merge request events");

    Ok(())
}

fn port(bind_addr: &str) -> &str {
    bind_addr.rsplit(':').next().unwrap_or(bind_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deployhook_core::RepositoryStore;
    use tempfile::TempDir;

    fn config(temp_dir: &TempDir) -> DeployhookConfig {
        DeployhookConfig {
            registry_path: temp_dir.path().join("repositories.json"),
            log_dir: temp_dir.path().join("logs"),
            ..Default::default()
        }
    }

    fn args(local_path: PathBuf, profile_type: &str) -> InstallArgs {
        InstallArgs {
            git_url: "git@gitlab.com:acme/shop.git".to_string(),
            local_path,
            branch: "main".to_string(),
            profile_type: profile_type.to_string(),
            name: None,
            no_clone: true,
        }
    }

    #[tokio::test]
    async fn test_install_registers_existing_tree() {
        let temp_dir = TempDir::new().unwrap();
        let tree = temp_dir.path().join("shop");
        std::fs::create_dir(&tree).unwrap();
        let config = config(&temp_dir);

        execute(args(tree.clone(), "symfony-api"), &config).await.unwrap();

        let registry = JsonRegistry::load(&config.registry_path).unwrap();
        let record = registry.get("shop").unwrap().unwrap();
        assert_eq!(record.profile_type, "symfony-api");
        assert_eq!(record.local_path, tree);
        assert_eq!(record.webhook_token.len(), 64);
    }

    #[tokio::test]
    async fn test_install_rejects_duplicates_and_unknown_types() {
        let temp_dir = TempDir::new().unwrap();
        let tree = temp_dir.path().join("shop");
        std::fs::create_dir(&tree).unwrap();
        let config = config(&temp_dir);

        let err = execute(args(tree.clone(), "rails"), &config).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::UnknownProfile(_))
        ));

        execute(args(tree.clone(), "simple"), &config).await.unwrap();
        let err = execute(args(tree, "simple"), &config).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::RepositoryExists(_))
        ));
    }

    #[test]
    fn test_port() {
        assert_eq!(port("0.0.0.0:8080"), "8080");
        assert_eq!(port("[::]:9000"), "9000");
    }
}
