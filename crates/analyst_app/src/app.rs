use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use data_analyst::{ConfigError, SessionConfig, SessionDriver, SnapshotPhase};
use tracing::info;

use crate::render::TranscriptRenderer;

pub const CONFIG_PATH_ENV: &str = "DATA_ANALYST_CONFIG_PATH";

#[derive(Debug, Parser)]
#[command(
    name = "data-analyst",
    version,
    about = "Ask an analysis agent about a CSV file and stream its steps and figures"
)]
pub struct Cli {
    /// CSV file to analyze.
    pub csv: PathBuf,

    /// Question or task for the agent.
    pub request: Option<String>,

    /// Directory the agent saves figures into; cleared before the run.
    #[arg(long)]
    pub figures_dir: Option<PathBuf>,
}

/// Resolves session config from `DATA_ANALYST_CONFIG_PATH`, falling back to env.
pub fn session_config_from_env() -> Result<SessionConfig, ConfigError> {
    match env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => SessionConfig::from_json_file(Path::new(&path)),
        _ => Ok(SessionConfig::from_env()),
    }
}

/// Runs one request to completion, rendering every snapshot to `out`.
pub fn run_request<W: Write>(
    driver: &SessionDriver,
    dataset: &Path,
    request: &str,
    out: W,
) -> Result<SnapshotPhase> {
    let mut renderer = TranscriptRenderer::new(out);
    let mut phase = None;

    for snapshot in driver.interact(dataset, request) {
        renderer
            .render(&snapshot)
            .context("failed to write transcript")?;
        phase = Some(snapshot.phase);
    }

    let Some(phase) = phase else {
        bail!("session ended without producing a snapshot");
    };
    info!(?phase, "request finished");
    Ok(phase)
}
