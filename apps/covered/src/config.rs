//! Covered configuration.
//!
//! Stored as TOML at `$XDG_CONFIG_HOME/covered/config.toml`
//! (`~/.config/covered/config.toml` when unset).

use std::path::{Path, PathBuf};
use std::time::Duration;

use covered_export::{DownloaderConfig, ExportConfig};
use covered_sync::SyncConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SteamGridDB API key.
    #[serde(default)]
    pub steamgriddb_api_key: String,

    /// Steam Web API key.
    #[serde(default)]
    pub steam_api_key: String,

    /// JSON file holding games and covers.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Pause between sync ticks, in seconds.
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Games fetched at once per sync tick.
    #[serde(default = "default_sync_concurrency")]
    pub sync_concurrency: usize,

    /// Minimum number of export download workers.
    #[serde(default = "default_export_min_workers")]
    pub export_min_workers: usize,

    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Timeout for SteamGridDB and Steam API calls.
    #[serde(default = "default_response_timeout")]
    pub response_timeout_secs: u64,

    #[serde(default = "default_app_list_refresh")]
    pub app_list_refresh_secs: u64,
}

fn default_catalog_path() -> PathBuf {
    let data_home = std::env::var_os("XDG_DATA_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".local").join("share"));
    data_home.join("covered").join("catalog.json")
}

fn default_sync_interval() -> u64 {
    1
}

fn default_sync_concurrency() -> usize {
    50
}

fn default_export_min_workers() -> usize {
    2
}

fn default_download_timeout() -> u64 {
    20
}

fn default_response_timeout() -> u64 {
    30
}

fn default_app_list_refresh() -> u64 {
    3600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            steamgriddb_api_key: String::new(),
            steam_api_key: String::new(),
            catalog_path: default_catalog_path(),
            sync_interval_secs: default_sync_interval(),
            sync_concurrency: default_sync_concurrency(),
            export_min_workers: default_export_min_workers(),
            download_timeout_secs: default_download_timeout(),
            response_timeout_secs: default_response_timeout(),
            app_list_refresh_secs: default_app_list_refresh(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, writing the defaults there first if
    /// the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!(path = %path.display(), "wrote default configuration");
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // Restrict permissions on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            interval: Duration::from_secs(self.sync_interval_secs),
            concurrency: self.sync_concurrency,
        }
    }

    pub fn export_config(&self) -> ExportConfig {
        ExportConfig {
            min_workers: self.export_min_workers,
        }
    }

    pub fn downloader_config(&self) -> DownloaderConfig {
        DownloaderConfig {
            timeout: Duration::from_secs(self.download_timeout_secs),
        }
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    pub fn app_list_refresh(&self) -> Duration {
        Duration::from_secs(self.app_list_refresh_secs)
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    let config_home = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".config"));
    config_home.join("covered").join("config.toml")
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}
