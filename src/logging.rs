//! Logging configuration and initialization.
//!
//! Console and file output are independent `tracing-subscriber` layers behind a
//! single `EnvFilter`. Each command run writes its own log file named after the
//! phase and start time.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::LoggingConfig;
use crate::error::PipelineError;

/// `<logs_dir>/<phase>_<YYYYMMDD_HHMMSS>.log`
pub fn log_file_path(logs_dir: &Path, phase: &str, at: DateTime<Local>) -> PathBuf {
    logs_dir.join(format!("{phase}_{}.log", at.format("%Y%m%d_%H%M%S")))
}

/// Filter directive for the configured level; `--verbose` forces `debug`.
pub fn directive(level: &str, verbose: bool) -> String {
    if verbose {
        "debug".to_string()
    } else if level.trim().is_empty() {
        "info".to_string()
    } else {
        level.trim().to_lowercase()
    }
}

fn build_filter(level: &str, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive(level, verbose)))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber. Returns the log file path when file output
/// is enabled.
pub fn init(
    config: &LoggingConfig,
    logs_dir: &Path,
    phase: &str,
    verbose: bool,
) -> Result<Option<PathBuf>, PipelineError> {
    let console_layer = fmt::layer().with_target(verbose);
    let console = config
        .console_output
        .then(|| console_layer.with_writer(std::io::stdout));

    let (file_layer, file_path) = if config.file_output {
        std::fs::create_dir_all(logs_dir)?;
        let path = log_file_path(logs_dir, phase, Local::now());
        let file = File::create(&path)?;
        let layer = fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(Mutex::new(file));
        (Some(layer), Some(path))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(build_filter(&config.level, verbose))
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| PipelineError::Logging(e.to_string()))?;

    Ok(file_path)
}
