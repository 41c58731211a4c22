use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// Extra ports registered as custom entries at startup.
    #[serde(default)]
    pub ports: Vec<CustomPortConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RefreshConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_kill_refresh_delay_ms")]
    pub kill_refresh_delay_ms: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
pub struct CustomPortConfig {
    pub port: u32,
    #[serde(default)]
    pub label: String,
}

// Defaults for RefreshConfig
fn default_interval_ms() -> u64 {
    5000
}

fn default_kill_refresh_delay_ms() -> u64 {
    500
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            kill_refresh_delay_ms: default_kill_refresh_delay_ms(),
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn kill_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.kill_refresh_delay_ms)
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.refresh.interval_ms == 0 {
            bail!("refresh.interval_ms must be greater than zero");
        }
        for entry in &self.ports {
            if entry.port == 0 || entry.port > u32::from(u16::MAX) {
                bail!("configured port {} is outside 1-65535", entry.port);
            }
        }
        Ok(())
    }
}

pub fn get_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".portmanager.json")
}

/// Load and validate `path`, falling back to defaults when it does not exist.
/// Nothing is ever written back.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::debug!("No config at {:?}, using defaults", path);
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = serde_json::from_str::<Config>(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}
