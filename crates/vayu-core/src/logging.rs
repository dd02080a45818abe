//! Tracing setup for the `vayu` binary.
//!
//! Events are appended to `$XDG_STATE_HOME/vayu/vayu.log`. When that file
//! cannot be opened the binary logs to stderr instead. Filter precedence is
//! `RUST_LOG`, then `log_filter` from the config file, then [`DEFAULT_FILTER`].

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,vayu=debug,vayu_core=debug";

/// Location of the log file, creating its directory if needed.
pub fn log_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("vayu")?;
    let path = dirs
        .place_state_file("vayu.log")
        .context("create vayu state directory")?;
    Ok(path)
}

/// Parse configured directives; a bad string is reported and ignored.
fn configured_filter(directives: &str) -> Option<EnvFilter> {
    match EnvFilter::try_new(directives) {
        Ok(filter) => Some(filter),
        Err(e) => {
            eprintln!("vayu: ignoring log_filter {:?}: {}", directives, e);
            None
        }
    }
}

fn build_filter(configured: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| configured.and_then(configured_filter))
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a subscriber writing to the log file. Returns the file's path.
/// Fails if the file cannot be opened or a subscriber is already installed.
pub fn init_file_logging(configured: Option<&str>) -> Result<PathBuf> {
    let path = log_path()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(build_filter(configured))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install tracing subscriber: {}", e))?;

    tracing::info!(path = %path.display(), "logging to file");
    Ok(path)
}

/// Install a subscriber writing to stderr. A no-op if one is already installed.
pub fn init_stderr_logging(configured: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(configured))
        .with_writer(std::io::stderr)
        .try_init();
}
