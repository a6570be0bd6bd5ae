//! Wrangler deploy subprocess wrapper.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::debug;

/// Options mapped onto `wrangler deploy` flags.
#[derive(Debug, Clone, Default)]
pub struct WranglerOptions {
    pub env: Option<String>,
    pub dry_run: bool,
    pub compatibility_date: Option<String>,
    pub compatibility_flags: Vec<String>,
    pub config: Option<PathBuf>,
    pub vars: Vec<(String, String)>,
}

/// Build the argument list for `wrangler deploy`.
fn build_args(options: &WranglerOptions) -> Vec<String> {
    let mut args = vec!["wrangler".to_string(), "deploy".to_string()];

    if let Some(ref env) = options.env {
        args.push("--env".into());
        args.push(env.clone());
    }
    if options.dry_run {
        args.push("--dry-run".into());
    }
    if let Some(ref date) = options.compatibility_date {
        args.push("--compatibility-date".into());
        args.push(date.clone());
    }
    for flag in &options.compatibility_flags {
        args.push("--compatibility-flags".into());
        args.push(flag.clone());
    }
    if let Some(ref config) = options.config {
        args.push("--config".into());
        args.push(config.display().to_string());
    }
    for (key, value) in &options.vars {
        args.push("--var".into());
        args.push(format!("{}:{}", key, value));
    }

    args
}

/// Run `wrangler deploy` with inherited stdio, so build output streams
/// directly to the user. Fails when the subprocess exits non-zero.
pub async fn run_wrangler_deploy(options: &WranglerOptions, verbose: bool) -> Result<()> {
    let args = build_args(options);

    println!("🚀 Running wrangler deploy...");
    if verbose {
        println!("Command: npx {}", args.join(" "));
    }
    debug!(?args, "spawning wrangler");

    // Wrangler is an npm package; npx resolves the local or global install.
    let status = Command::new("npx")
        .args(&args)
        .status()
        .await
        .context("failed to spawn npx wrangler")?;

    if !status.success() {
        bail!(
            "wrangler deploy failed with exit code {}",
            status.code().unwrap_or(-1)
        );
    }

    println!("✅ Deployment successful!");
    Ok(())
}
