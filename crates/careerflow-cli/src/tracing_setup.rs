use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter directives for the stderr layer, e.g. `careerflow_core=debug`
pub const LOG_ENV: &str = "CAREERFLOW_LOG";
/// When set, every debug-level event is also appended to this file
pub const LOG_FILE_ENV: &str = "CAREERFLOW_LOG_FILE";

const DEFAULT_DIRECTIVES: &str = "warn";

pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    // stdout carries snapshots, so logs always go to stderr
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(filter);

    let registry = tracing_subscriber::registry().with(stderr_layer);

    if let Ok(log_path) = std::env::var(LOG_FILE_ENV) {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file: {}", log_path))?;

        let file_layer = fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_filter(LevelFilter::DEBUG);

        registry
            .with(file_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;
        eprintln!("File logging enabled: {}", log_path);
    } else {
        registry
            .try_init()
            .context("Failed to install tracing subscriber")?;
    }
    Ok(())
}
