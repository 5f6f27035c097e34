//! Configuration file loading.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Prediction server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Base URL of the server, without a trailing path
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

/// Audio capture settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `emovox list-devices`
    /// - device name from `emovox list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Requested sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Reference level in dBFS for a full level meter (typical: -20 to -6 dBFS)
    #[serde(default = "default_reference_level_db")]
    pub reference_level_db: i8,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            reference_level_db: default_reference_level_db(),
        }
    }
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_reference_level_db() -> i8 {
    -20
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmovoxConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

impl EmovoxConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the config file cannot be read
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Loads configuration from an explicit path.
    ///
    /// # Errors
    /// - If the file cannot be read or the TOML is malformed
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        Self::parse(&content)
    }

    /// Parses configuration text. Unknown keys such as `config_version` are ignored.
    ///
    /// # Errors
    /// - If the TOML is malformed
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: EmovoxConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;
        Ok(config)
    }
}

/// Path of the configuration file. Creates the config directory if needed.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn config_path() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
        .join(".config")
        .join("emovox");

    fs::create_dir_all(&config_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create config directory: {e}"))?;

    Ok(config_dir.join("emovox.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_default_config_parses() {
        let text = format!(
            "config_version = \"0.1.0\"\n{}",
            include_str!("../../environments/emovox.toml")
        );
        let config = EmovoxConfig::parse(&text).unwrap();
        assert_eq!(config, EmovoxConfig::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = EmovoxConfig::parse("[server]\nbase_url = \"https://ser.example\"\n").unwrap();
        assert_eq!(config.server.base_url, "https://ser.example");
        assert_eq!(config.audio.device, "default");
        assert_eq!(config.audio.sample_rate, 16000);
    }

    #[test]
    fn test_malformed_config_is_rejected() {
        assert!(EmovoxConfig::parse("[audio]\nsample_rate = \"fast\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emovox.toml");
        std::fs::write(&path, "[audio]\ndevice = \"2\"\n").unwrap();
        assert_eq!(EmovoxConfig::load_from(&path).unwrap().audio.device, "2");
        assert!(EmovoxConfig::load_from(&dir.path().join("missing.toml")).is_err());
    }
}
