pub mod web;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use aircon_engine::{build_orchestrator, open_store, Settings};

use crate::web::{router, AppState};

/// Ticks the daily decision cycle and serves the schedule API.
#[derive(Parser)]
#[command(name = "aircon-server", version)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Seconds between cycles.
    #[arg(long, env = "TICK_INTERVAL_SECS", default_value_t = 300)]
    tick_interval_secs: u64,
}

async fn tick_loop(state: AppState, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        // Outcome and errors are logged and kept in the status by run_and_record.
        let _ = state.run_and_record().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if cli.settings.data_file.is_none() {
        warn!("no data file configured; schedules and daily marks live in memory only");
    }

    let kv = open_store(&cli.settings);
    let orchestrator = build_orchestrator(&cli.settings, kv).context("invalid configuration")?;
    let state = AppState::new(Arc::new(orchestrator));

    let listener = tokio::net::TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("failed to bind {}", cli.listen))?;
    info!(addr = %cli.listen, "starting schedule API");
    let app = router(state.clone());
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let period = Duration::from_secs(cli.tick_interval_secs.max(1));
    info!(tick_secs = period.as_secs(), "starting cycle loop");
    tokio::select! {
        _ = tick_loop(state, period) => {}
        result = server => {
            result.context("web server task panicked")?.context("web server failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }
    Ok(())
}
