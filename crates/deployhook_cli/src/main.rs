//! deployhook CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments / unknown repository
//! - 3: Deployment failure

use std::process::ExitCode;

use clap::Parser;
use deployhook_core::CoreError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands, DeploymentFailed};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const DEPLOYMENT_FAILURE: u8 = 3;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "deployhook=debug" } else { "deployhook=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},deployhook_core={},deployhook_server={},deployhook_runner={},tower_http=info,warn",
            default_level,
            level(cli.verbose),
            level(cli.verbose),
            level(cli.verbose),
        ))
    });
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            return ExitCode::from(ExitCodes::GENERAL_ERROR);
        }
    };

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, config).await,
        Commands::Install(args) => commands::install::execute(args, &config).await,
        Commands::List => commands::list::execute(&config).await,
        Commands::Remove(args) => commands::remove::execute(args, &config).await,
        Commands::Logs(args) => commands::logs::execute(args, &config).await,
        Commands::Test(args) => commands::test::execute(args, &config).await,
        Commands::Profiles => commands::profiles::execute().await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

fn level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if e.downcast_ref::<DeploymentFailed>().is_some() {
        return ExitCodes::DEPLOYMENT_FAILURE;
    }

    match e.downcast_ref::<CoreError>() {
        Some(
            CoreError::UnknownProfile(_)
            | CoreError::RepositoryNotFound(_)
            | CoreError::RepositoryExists(_),
        ) => ExitCodes::INVALID_ARGS,
        Some(CoreError::AnchorUnavailable(_)) => ExitCodes::DEPLOYMENT_FAILURE,
        _ => ExitCodes::GENERAL_ERROR,
    }
}
