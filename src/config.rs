//! Installer configuration file
//!
//! Loaded from `--config` or `<config_dir>/local-ffmpeg/config.toml`. The
//! default file is created on first use. Every field has a default, so an
//! empty or partial file is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::info;
use serde::{Deserialize, Serialize};

use crate::detection::{DEFAULT_HEALTH_TIMEOUT, HealthCheck};

const APP_DIR: &str = "local-ffmpeg";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Install root; `bin/` and `lib/` are created beneath it
    pub install_dir: Option<PathBuf>,
    /// Parent for scratch download directories (system temp dir when unset)
    pub download_dir: Option<PathBuf>,
    /// Seconds each binary gets to answer `-version`
    pub health_check_timeout_secs: u64,
    pub download: DownloadConfig,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            install_dir: None,
            download_dir: None,
            health_check_timeout_secs: DEFAULT_HEALTH_TIMEOUT.as_secs(),
            download: DownloadConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub connect_timeout_secs: u64,
    /// Abort when no data arrives for this long
    pub inactivity_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            inactivity_timeout_secs: 300,
            user_agent: format!("local-ffmpeg/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl DownloadConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}

impl InstallerConfig {
    /// Default config file location
    pub fn default_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from an explicit path, or from the default location (creating it if absent)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Self::default_path()?;
                if !path.exists() {
                    Self::write_default(&path)?;
                }
                Self::from_file(&path)
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Serialize and write the default config
    pub fn write_default(path: &Path) -> Result<()> {
        info!("Config not found at {}, creating default configuration", path.display());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let default_toml = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;
        fs::write(path, default_toml).context("Failed to write config file")?;
        Ok(())
    }

    /// Install root: CLI override, then config, then `<data_local_dir>/local-ffmpeg`
    pub fn resolve_install_dir(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = cli_override {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = &self.install_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow!("Could not determine local data directory"))?;
        Ok(data_dir.join(APP_DIR))
    }

    pub fn health_check(&self) -> HealthCheck {
        HealthCheck::new(Duration::from_secs(self.health_check_timeout_secs))
    }
}
