use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is not set
pub fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub fn log_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?;
    Ok(data_dir.join("ask-ai").join("logs"))
}

/// Logs go to a daily rolling file; stderr is taken by the terminal UI.
/// Keep the guard alive until exit or buffered lines are lost.
pub fn init(verbose: u8, dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)?;

    let appender = tracing_appender::rolling::daily(dir, "ask-ai.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {}", e))?;

    Ok(guard)
}
