//! deploy-notify daemon entry point.
//!
//! Loads configuration, initializes the dedup state store and the Telegram
//! channel, and starts the webhook server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use deploy_notify_core::config::AppConfig;
use deploy_notify_core::notify::{NotificationChannel, TelegramChannel};
use deploy_notify_core::state::StateStore;
use deploy_notify_core::store::SqliteStore;
use deploy_notify_web::WebServer;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// deploy-notify webhook service daemon.
#[derive(Parser, Debug)]
#[command(
    name = "deploy-notify-daemon",
    version,
    about = "Deployment notification webhook service"
)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Override the log level from the config file (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load and resolve configuration
    let mut config =
        AppConfig::load_from_file(&args.config).context("failed to load configuration file")?;
    config
        .resolve_env_vars()
        .context("failed to resolve environment variables in config")?;
    config
        .validate()
        .context("configuration validation failed")?;

    // Initialize tracing
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.server.log_level);

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    // Startup banner
    info!("========================================");
    info!("deploy-notify daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!(listen = %config.server.listen, "configuration loaded");

    if config.auth.notify_token.is_none() {
        warn!(
            env = %config.auth.notify_token_env,
            "notify token is not set; all webhook requests will be rejected"
        );
    }

    // Dedup state store
    let db_path = config.server.data_dir.join("deploy-notify.db");
    std::fs::create_dir_all(&config.server.data_dir)
        .context("failed to create data directory")?;
    let store = SqliteStore::new(&db_path).context("failed to open state store")?;
    let state_store = StateStore::new(Arc::new(store));

    // Telegram channel
    let channel = TelegramChannel::from_config(&config.telegram).with_context(|| {
        format!(
            "Telegram bot token not available (set {})",
            config.telegram.bot_token_env
        )
    })?;

    if !channel.test_connection().await {
        warn!("Telegram connection test failed; notifications may not be delivered");
    } else {
        info!("Telegram connection verified");
    }

    // Start the web server (runs until the process is stopped)
    let listen = config.server.listen.clone();
    let server = WebServer::new(config, state_store, Arc::new(channel));
    server.start(&listen).await.context("web server failed")?;

    Ok(())
}
