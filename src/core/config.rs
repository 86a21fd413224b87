use crate::core::fetch::default_user_agent;
use crate::error::{ArcfetchError, Result};
use crate::utils::fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Directory every archive is extracted into.
    pub destination: PathBuf,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            destination: default_destination(),
            user_agent: default_user_agent(),
            timeout_secs: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write_file(config_path, content.as_bytes())
    }

    pub fn set_destination(&mut self, destination: PathBuf) -> Result<()> {
        self.destination = destination;
        self.validate()?;
        self.save()
    }

    fn validate(&self) -> Result<()> {
        if self.destination.as_os_str().is_empty() {
            return Err(ArcfetchError::config_error("destination must not be empty"));
        }
        if self.timeout_secs == Some(0) {
            return Err(ArcfetchError::config_error(
                "timeout_secs must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn default_destination() -> PathBuf {
    dirs::download_dir()
        .map(|dir| dir.join("arcfetch"))
        .unwrap_or_else(|| PathBuf::from("downloads"))
}

fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("arcfetch"))
        .ok_or(ArcfetchError::HomeDirectoryNotFound)
}

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.json"))
}
