use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Reference chunk size for the byte-stream copier (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Global configuration loaded from `~/.config/vayu/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bytes read and written per chunk.
    pub chunk_size_bytes: usize,
    /// How often a paused worker re-checks the pause/cancel flags.
    pub pause_poll_interval_ms: u64,
    /// Completed-item events buffered for slow subscribers.
    pub completed_buffer: usize,
    /// Skip media whose display name already exists at the destination.
    #[serde(default = "default_skip_existing")]
    pub skip_existing: bool,
    /// Tracing filter directives for the log file; `RUST_LOG` still wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

fn default_skip_existing() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            pause_poll_interval_ms: 100,
            completed_buffer: 64,
            skip_existing: true,
            log_filter: None,
        }
    }
}

impl EngineConfig {
    pub fn pause_poll_interval(&self) -> Duration {
        Duration::from_millis(self.pause_poll_interval_ms)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size_bytes == 0 {
            anyhow::bail!("chunk_size_bytes must be greater than zero");
        }
        if self.completed_buffer == 0 {
            anyhow::bail!("completed_buffer must be greater than zero");
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vayu")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<EngineConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = EngineConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: EngineConfig = toml::from_str(&data)?;
    cfg.validate()?;
    Ok(cfg)
}
