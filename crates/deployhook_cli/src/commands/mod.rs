//! CLI command definitions.
//!
//! `serve` runs the webhook endpoint; the other subcommands manage the
//! repository registry and inspect deployments.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deployhook_core::DeployhookConfig;
use thiserror::Error;

pub mod install;
pub mod list;
pub mod logs;
pub mod profiles;
pub mod remove;
pub mod serve;

/// deployhook - webhook-triggered deployments with rollback
#[derive(Parser)]
#[command(name = "deployhook")]
#[command(version, about = "deployhook - webhook-triggered deployments with rollback")]
#[command(long_about = r#"
deployhook receives GitLab push and merge request webhooks and redeploys the
matching working tree. When a deployment step fails, completed steps are
compensated in reverse order and the tree is reset to the commit it was on.

COMMANDS:
  serve     → Run the webhook server
  install   → Clone and register a repository
  list      → List registered repositories
  remove    → Unregister a repository
  logs      → Show the event log
  test      → Deploy a repository now, without a webhook
  profiles  → List deployment profiles

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments / unknown repository
  3 - Deployment failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "DEPLOYHOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Repository registry file
    #[arg(long, global = true, env = "DEPLOYHOOK_REGISTRY")]
    pub registry: Option<PathBuf>,

    /// Event log directory
    #[arg(long, global = true, env = "DEPLOYHOOK_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Configuration file (if any) with command-line overrides applied.
    pub fn load_config(&self) -> Result<DeployhookConfig> {
        let mut config = DeployhookConfig::load_or_default(self.config.as_deref())
            .context("Failed to load configuration")?;

        if let Some(registry) = &self.registry {
            config.registry_path = registry.clone();
        }
        if let Some(log_dir) = &self.log_dir {
            config.log_dir = log_dir.clone();
        }

        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the webhook server
    Serve(serve::ServeArgs),

    /// Clone a repository and register it for deployments
    Install(install::InstallArgs),

    /// List registered repositories
    List,

    /// Unregister a repository
    Remove(remove::RemoveArgs),

    /// Show the last lines of an event log
    Logs(logs::LogsArgs),

    /// Run a deployment now, without a webhook
    Test(test::TestArgs),

    /// List deployment profiles and their steps
    Profiles,
}

/// A deployment ran and failed.
#[derive(Debug, Error)]
#[error("Deployment failed at step: {step}")]
pub struct DeploymentFailed {
    pub step: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_install() {
        let cli = Cli::try_parse_from([
            "deployhook",
            "install",
            "git@gitlab.com:acme/shop.git",
            "/srv/shop",
            "--type",
            "symfony-api",
            "--no-clone",
        ])
        .unwrap();

        match cli.command {
            Commands::Install(args) => {
                assert_eq!(args.git_url, "git@gitlab.com:acme/shop.git");
                assert_eq!(args.branch, "main");
                assert_eq!(args.profile_type, "symfony-api");
                assert!(args.no_clone);
            }
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn test_parse_logs_defaults() {
        let cli = Cli::try_parse_from(["deployhook", "logs"]).unwrap();
        match cli.command {
            Commands::Logs(args) => {
                assert_eq!(args.name, None);
                assert_eq!(args.lines, 50);
            }
            _ => panic!("expected logs"),
        }
    }

    #[test]
    fn test_registry_override() {
        let cli = Cli::try_parse_from([
            "deployhook",
            "--registry",
            "/tmp/repos.json",
            "list",
        ])
        .unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(config.registry_path, PathBuf::from("/tmp/repos.json"));
    }
}
