use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const APP_IDENTIFIER: &str = "com.eclipsepdf.app";
pub const APP_NAME: &str = "Eclipse PDF";

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_daily_limit")]
    pub daily_limit_secs: u64,
    /// Local hour at which a new trial day begins.
    #[serde(default = "default_cutoff_hour")]
    pub day_cutoff_hour: u32,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    #[serde(default = "default_usage_sync_every")]
    pub usage_sync_every_ticks: u32,
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout_secs: u64,
    /// Upper bound on the view's unsaved-changes query and save command.
    #[serde(default = "default_view_timeout")]
    pub view_timeout_secs: u64,
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub debug: bool,
}

fn default_daily_limit() -> u64 {
    3600
}

fn default_cutoff_hour() -> u32 {
    4
}

fn default_tick_interval() -> u64 {
    5
}

fn default_usage_sync_every() -> u32 {
    12
}

fn default_remote_timeout() -> u64 {
    8
}

fn default_view_timeout() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            daily_limit_secs: default_daily_limit(),
            day_cutoff_hour: default_cutoff_hour(),
            tick_interval_secs: default_tick_interval(),
            usage_sync_every_ticks: default_usage_sync_every(),
            remote_timeout_secs: default_remote_timeout(),
            view_timeout_secs: default_view_timeout(),
            backend_url: None,
            debug: false,
        }
    }
}

impl AppConfig {
    /// Reads `config.json` from `data_dir`, then applies environment
    /// overrides. A missing or unreadable file yields defaults.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = if path.exists() {
            match Self::read_file(&path) {
                Ok(config) => config,
                Err(err) => {
                    warn!("Ignoring config at {}: {err:#}", path.display());
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.normalize();
        config
    }

    fn read_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ECLIPSE_BACKEND_URL").filter(|v| !v.trim().is_empty()) {
            self.backend_url = Some(url.trim().to_string());
        }
        if let Some(value) = lookup("ECLIPSE_DEBUG") {
            self.debug = value == "1" || value.eq_ignore_ascii_case("true");
        }
        if let Some(limit) = lookup("ECLIPSE_DAILY_LIMIT_SECS").and_then(|v| v.parse().ok()) {
            self.daily_limit_secs = limit;
        }
    }

    fn normalize(&mut self) {
        self.day_cutoff_hour = self.day_cutoff_hour.min(23);
        self.tick_interval_secs = self.tick_interval_secs.max(1);
        self.usage_sync_every_ticks = self.usage_sync_every_ticks.max(1);
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }

    pub fn view_timeout(&self) -> Duration {
        Duration::from_secs(self.view_timeout_secs)
    }
}

/// Per-user application data directory, created if missing.
pub fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(dirs::home_dir)
        .context("no data or home directory available")?;
    let dir = base.join(APP_IDENTIFIER);
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create data directory {}", dir.display()))?;
    Ok(dir)
}
