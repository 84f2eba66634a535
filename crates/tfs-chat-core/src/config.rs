use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
pub const API_URL_ENV: &str = "TFS_CHAT_API_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_base_url: Some(DEFAULT_API_BASE_URL.to_string()),
            data_dir: None,
            log_level: None,
        }
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Read a config file, or the defaults when it does not exist.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    /// Backend base URL: environment first, then the config file, then the default.
    pub fn api_base_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    /// Where the activity history and the log file live.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;
        Ok(data_dir.join("tfs-chat"))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("tfs-chat").join("config.json"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
