use std::io;
use std::process::ExitCode;

use analyst_app::app::{run_request, session_config_from_env, Cli};
use analyst_app::providers;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use data_analyst::{SessionDriver, SnapshotPhase};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn";

fn main() -> Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = session_config_from_env().context("failed to load session config")?;
    if let Some(figures_dir) = cli.figures_dir {
        config = config.with_figures_dir(figures_dir);
    }

    let agent = providers::provider_from_env().map_err(|error| anyhow!(error))?;
    let driver = SessionDriver::new(agent, config);
    let request = cli.request.unwrap_or_default();

    let phase = run_request(&driver, &cli.csv, &request, io::stdout().lock())?;
    Ok(match phase {
        SnapshotPhase::Done => ExitCode::SUCCESS,
        SnapshotPhase::InProgress | SnapshotPhase::Failed(_) => ExitCode::FAILURE,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .try_init();
}
