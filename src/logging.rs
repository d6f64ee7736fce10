//! Log setup. The terminal belongs to the UI, so events only ever go to a
//! file; without one, logging stays off.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Builds the filter. `RUST_LOG` wins over the configured level.
pub fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber. Returns the log file in use, if any.
/// A subscriber installed earlier (tests, embedding) is left in place.
pub fn init(config: &LoggingConfig) -> Result<Option<PathBuf>> {
    let Some(path) = config.file.as_deref() else {
        return Ok(None);
    };
    let file = open_log_file(path)?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter(&config.level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .is_ok();
    if installed {
        tracing::info!(version = crate::VERSION, "logging started");
    }
    Ok(Some(path.to_path_buf()))
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("logging: failed to create directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("logging: failed to open {}", path.display()))
}
