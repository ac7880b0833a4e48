//! floodwarden: rate-based chat moderation over a stdio transport.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use floodwarden::channels::stdio::{self, StdioSink};
use floodwarden::config::Config;
use floodwarden::moderation::ModerationCoordinator;

#[derive(Debug, Parser)]
#[command(
    name = "floodwarden",
    version,
    about = "Rate-based chat moderation: escalating warnings and timed mutes"
)]
struct Cli {
    /// Path to a TOML config file. Defaults + environment apply without one.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset, e.g. `info` or `floodwarden=debug`.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if config.monitored_channels.is_empty() {
        tracing::warn!("No monitored channels configured; nothing will be moderated");
    }
    tracing::info!(
        monitored = config.monitored_channels.len(),
        threshold = config.message_threshold,
        window_secs = config.time_window_secs,
        "floodwarden online"
    );

    let (handle, coordinator) = ModerationCoordinator::spawn(&config, Arc::new(StdioSink));

    tokio::select! {
        result = stdio::pump_stdin(&handle) => {
            result.context("reading message events")?;
            tracing::info!("Event stream closed, shutting down");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
        }
    }

    // Pending unmute timers die with the process; mutes are in-memory only.
    drop(handle);
    coordinator.abort();
    Ok(())
}
