//! deploy-notify command-line deploy wrapper.
//!
//! Wraps `wrangler deploy` and, on success, reports the deployment to the
//! deploy-notify webhook service. A failed notification never fails the
//! deploy; a failed deploy always propagates a non-zero exit.

mod deploy;
mod git;
mod notify;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use deploy_notify_core::models::{DeploymentKind, PushDeploymentPayload};

use crate::deploy::WranglerOptions;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Deploy to Cloudflare Workers with deployment notifications.
#[derive(Parser, Debug)]
#[command(
    name = "deploy-notify",
    version,
    about = "Deploy to Cloudflare Workers and notify the deployment monitor"
)]
struct Cli {
    /// URL of the deployment notification service.
    #[arg(long, env = "DEPLOY_NOTIFY_URL")]
    notify_url: Option<String>,

    /// Authentication token for notifications.
    #[arg(long, env = "DEPLOY_NOTIFY_TOKEN", hide_env_values = true)]
    notify_token: Option<String>,

    /// Environment to deploy to.
    #[arg(short, long)]
    env: Option<String>,

    /// Perform a dry run (build but don't deploy).
    #[arg(long)]
    dry_run: bool,

    /// Compatibility date for the deployment.
    #[arg(long)]
    compatibility_date: Option<String>,

    /// Compatibility flags (can be used multiple times).
    #[arg(long = "compatibility-flags")]
    compatibility_flags: Vec<String>,

    /// Path to the wrangler config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Variables to pass to the deployment, as key:value (repeatable).
    #[arg(long = "var", value_name = "KEY:VALUE", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// Override the project name.
    #[arg(long)]
    project_name: Option<String>,

    /// Tag for this deployment.
    #[arg(long)]
    tag: Option<String>,

    /// Skip sending the notification.
    #[arg(long)]
    skip_notification: bool,

    /// Show verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(':') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key:value, got '{}'", raw)),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Minimal logging for the CLI; --verbose raises it to debug.
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .without_time()
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Deployment failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let git_info = git::collect_git_info().await;

    let project_name = cli.project_name.clone().unwrap_or_else(|| {
        let wrangler_toml = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from("wrangler.toml"));
        git::detect_project_name(&wrangler_toml)
    });

    let deployment_id = std::env::var("WORKERS_CI_BUILD_UUID")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| format!("deploy-{}", uuid::Uuid::new_v4()));

    let is_ci = std::env::var("CI").map(|v| v == "true").unwrap_or(false)
        || std::env::var("WORKERS_CI").map(|v| v == "1").unwrap_or(false);

    let environment = cli
        .env
        .clone()
        .or_else(|| std::env::var("ENVIRONMENT").ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "production".into());

    let deployment = PushDeploymentPayload {
        kind: DeploymentKind::Worker,
        project_name,
        deployment_id,
        branch: Some(git_info.branch),
        commit_hash: Some(git_info.commit_hash),
        commit_message: Some(git_info.commit_message),
        author: Some(git_info.author),
        timestamp: Some(chrono::Utc::now().to_rfc3339()),
        environment: Some(environment),
        tag: cli.tag.clone().or(git_info.tag),
        url: None,
        is_ci: Some(is_ci),
    };

    let options = WranglerOptions {
        env: cli.env.clone(),
        dry_run: cli.dry_run,
        compatibility_date: cli.compatibility_date.clone(),
        compatibility_flags: cli.compatibility_flags.clone(),
        config: cli.config.clone(),
        vars: cli.vars.clone(),
    };

    // The deploy itself is the only step allowed to fail the command.
    deploy::run_wrangler_deploy(&options, cli.verbose).await?;

    match (&cli.notify_url, &cli.notify_token) {
        _ if cli.skip_notification => {}
        (Some(url), Some(token)) => {
            println!("📤 Sending deployment notification...");
            match notify::send_notification(url, token, &deployment).await {
                Ok(response) => {
                    println!(
                        "✅ Notification sent successfully: {}",
                        response.message.as_deref().unwrap_or("ok")
                    );
                }
                Err(e) => {
                    // Never fail the deployment because of the notification.
                    eprintln!("⚠️  Failed to send notification: {:#}", e);
                }
            }
        }
        _ => {
            println!("ℹ️  Deployment notification skipped (no URL or token configured)");
        }
    }

    Ok(())
}
