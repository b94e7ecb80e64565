//! Tracing subscriber setup.
//!
//! Two sinks: a plain-text log file in the output folder, which is the
//! durable record of a run, and stderr for warnings and errors.
//! `RUST_LOG` overrides the file's default `debug` level.

use chrono::{DateTime, Local};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::filter::{EnvFilter, LevelFilter, ParseError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{Layer, fmt};

#[derive(Error, Debug)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid log filter: {0}")]
    Filter(#[from] ParseError),
    #[error("Logging already initialized: {0}")]
    Init(#[from] TryInitError),
}

const DEFAULT_FILTER: &str = "debug";

/// `{YYYY-MM-DD_HH-MM-SS}_mets-packager.log`
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("{}_mets-packager.log", started.format("%Y-%m-%d_%H-%M-%S"))
}

/// Install the global subscriber; returns the path of the log file.
pub fn init(output_dir: &Path, started: DateTime<Local>) -> Result<PathBuf, LogError> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(log_file_name(started));
    let file = File::create(&path)?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(DEFAULT_FILTER)?,
    };

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .with_filter(filter);
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;
    Ok(path)
}
