use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use aircon_engine::{build_orchestrator, open_store, Settings};

/// Run a single decision cycle and print its outcome.
///
/// Meant to be fired by an external timer. The data file carries today's
/// mark from one run to the next.
#[derive(Parser)]
#[command(name = "aircon-autorun", version)]
struct Cli {
    #[command(flatten)]
    settings: Settings,
}

// Distinct exit code so timers can alert on failed external calls.
const EXIT_EXTERNAL_FAILURE: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(data_file) = &cli.settings.data_file else {
        bail!("--data-file is required: without it the daily mark is lost when the process exits");
    };
    info!(data_file = %data_file.display(), "running one cycle");

    let orchestrator = build_orchestrator(&cli.settings, open_store(&cli.settings))
        .context("invalid configuration")?;
    let outcome = orchestrator.run_cycle().await.context("cycle aborted")?;

    println!("{outcome}");
    if outcome.is_error() {
        std::process::exit(EXIT_EXTERNAL_FAILURE);
    }
    Ok(())
}
