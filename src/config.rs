use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const CONFIG_DIR_PREFIX: &str = "pacing-sync";
const DEFAULT_BASE_URL: &str = "https://api.basis.net/v1";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default = "default_clients")]
    pub clients: Vec<ClientConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            clients: default_clients(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// A client whose campaign is mirrored into a pacing report.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClientConfig {
    pub name: String,
    pub campaign_id: String,
    pub report_path: PathBuf,
}

fn default_clients() -> Vec<ClientConfig> {
    vec![ClientConfig {
        name: "Example Client".to_string(),
        campaign_id: "mock-campaign-id".to_string(),
        report_path: PathBuf::from("/mock/path/pacing.xlsx"),
    }]
}

impl Config {
    /// Load the config file, falling back to the built-in client list when
    /// no file has been written yet.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file()?;

        if !config_path.exists() {
            debug!(path = ?config_path, "No config file, using built-in clients");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)?;
        Self::parse(&contents)
    }

    fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        if config.api.base_url.trim().is_empty() {
            return Err(AppError::Config(
                "api.base_url must not be empty".to_string(),
            ));
        }

        for client in &config.clients {
            if client.campaign_id.is_empty() {
                return Err(AppError::Config(format!(
                    "Client '{}' has no campaign_id",
                    client.name
                )));
            }
        }

        Ok(config)
    }

    fn xdg_dirs() -> xdg::BaseDirectories {
        xdg::BaseDirectories::with_prefix(CONFIG_DIR_PREFIX)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        let xdg_dirs = Self::xdg_dirs();
        xdg_dirs
            .place_config_file("config.toml")
            .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))
    }
}
