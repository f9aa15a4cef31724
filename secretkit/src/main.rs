//! secretkit - AWS Secrets Manager demonstration client
//!
//! Creates, reads, updates, lists and deletes secrets, one SDK call per
//! operation. `secretkit demo` runs the whole lifecycle on a throwaway secret.

mod commands;
mod config;

use anyhow::Context;
use clap::Parser;
use secretkit_core::RequestContext;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::Command;
use crate::config::{Config, Overrides};

#[derive(Parser, Debug)]
#[command(name = "secretkit")]
#[command(about = "Manage AWS Secrets Manager secrets", long_about = None)]
struct Args {
    /// AWS region (defaults to the SDK provider chain)
    #[arg(long, global = true, env = "SECRETKIT_REGION")]
    region: Option<String>,

    /// Override the Secrets Manager endpoint
    #[arg(long, global = true, env = "SECRETKIT_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Named profile from the shared AWS config files
    #[arg(long, global = true, env = "SECRETKIT_PROFILE")]
    profile: Option<String>,

    /// Per-request timeout in seconds (0 disables it)
    #[arg(long, global = true, env = "SECRETKIT_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "SECRETKIT_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr, command output to stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("secretkit={}", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load().context("Couldn't load config!")?;
    config.apply(Overrides {
        region: args.region,
        endpoint_url: args.endpoint_url,
        profile: args.profile,
        timeout_secs: args.timeout_secs,
    });

    info!(
        region = config.aws.region.as_deref().unwrap_or("<default>"),
        "Starting secretkit"
    );

    let client = config.sdk_client().await;

    let mut ctx = RequestContext::new();
    if let Some(timeout) = config.timeout() {
        ctx = ctx.with_timeout(timeout);
    }

    // Ctrl-C aborts whatever request is in flight
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling request");
            interrupt.cancel();
        }
    });

    let mut out = std::io::stdout();
    commands::run(args.command, &ctx, &client, &mut out).await
}
