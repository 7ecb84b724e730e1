//! CLI entry point for prkeeper.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use clap::Parser;
use prkeeper_core::config::load_config;
use prkeeper_core::keeper::{ContinuationPolicy, RecordKeeper};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.default_log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    let range = args.scope_range().map_err(|msg| anyhow!(msg))?;

    let loaded = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    let mut config = loaded.config;
    if let Some(dir) = args.download_dir {
        config.storage.download_dir = dir;
    }
    if args.sidecar {
        config.storage.sidecar = true;
    }
    debug!(
        path = ?loaded.path,
        from_file = loaded.loaded_from_file,
        "configuration resolved"
    );

    info!(
        start = range.start(),
        end = range.end(),
        download_dir = %config.storage.download_dir.display(),
        "prkeeper starting"
    );

    let policy = ContinuationPolicy::new(config.enumeration.max_consecutive_misses, Utc::now());
    let keeper = RecordKeeper::from_config(&config, policy).context("Failed to set up run")?;
    let summary = keeper.run(range).await?;

    info!(
        accepted = summary.accepted(),
        rejected = summary.total_rejected(),
        fetch_failures = summary.fetch_failures(),
        last_accepted = summary.last_accepted(),
        stop_reason = %summary.stop_reason(),
        "Run complete"
    );

    Ok(())
}
