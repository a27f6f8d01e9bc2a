//! Serve command - Run the webhook server.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use deployhook_core::DeployhookConfig;
use deployhook_server::AppState;

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(short, long, env = "DEPLOYHOOK_BIND")]
    bind: Option<String>,

    /// Log deployment commands instead of running them
    #[arg(long)]
    dry_run: bool,
}

pub async fn execute(args: ServeArgs, mut config: DeployhookConfig) -> Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.dry_run {
        config.dry_run = true;
    }
    config.validate().context("Invalid configuration")?;
    let addr = config.socket_addr()?;

    info!(
        "Registry: {}, logs: {}",
        config.registry_path.display(),
        config.log_dir.display()
    );
    if config.dry_run {
        info!("Dry-run mode: commands are logged, not executed");
    }

    println!("🚀 deployhook listening on http://{}", addr);
    println!("   Webhook URL: http://{}/webhook", addr);

    let state = AppState::from_config(&config);
    deployhook_server::serve(state, addr)
        .await
        .context("Webhook server failed")?;

    Ok(())
}
