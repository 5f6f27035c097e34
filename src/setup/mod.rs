//! First-run setup and config migration.
//!
//! Writes the embedded default configuration when none exists, and rewrites it
//! when the stored `config_version` is older than the running binary.

pub mod version;

use anyhow::anyhow;
use std::path::Path;

/// Embedded default configuration template.
const DEFAULT_CONFIG: &str = include_str!("../../environments/emovox.toml");

/// Current application version from Cargo.toml
const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runs setup if the config file is missing or outdated.
///
/// # Errors
/// - If the config file cannot be read or written
pub fn ensure_config(config_path: &Path) -> anyhow::Result<()> {
    if !config_path.exists() {
        tracing::info!("No configuration found, writing defaults");
        return write_default_config(config_path);
    }

    match version::check_setup_needed(config_path)? {
        Some(old_version) => {
            tracing::info!(
                "Setup needed - migrating from version {} to {}",
                old_version,
                CURRENT_VERSION
            );
            version::update_config_version(config_path).map_err(|e| {
                tracing::error!("Failed to update config version: {e}");
                anyhow!("Failed to update config version: {e}")
            })?;
            tracing::info!("Configuration migrated to version {}", CURRENT_VERSION);
        }
        None => {
            tracing::debug!("Config version up to date ({})", CURRENT_VERSION);
        }
    }

    Ok(())
}

/// Writes the default configuration with a version header.
///
/// # Errors
/// - If the parent directory or file cannot be written
pub fn write_default_config(config_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = format!("config_version = \"{CURRENT_VERSION}\"\n{DEFAULT_CONFIG}");
    std::fs::write(config_path, content)?;
    tracing::info!("Default configuration written to {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmovoxConfig;

    #[test]
    fn test_missing_config_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("emovox.toml");

        ensure_config(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(&format!("config_version = \"{CURRENT_VERSION}\"")));
        assert_eq!(EmovoxConfig::parse(&content).unwrap(), EmovoxConfig::default());
        assert_eq!(version::check_setup_needed(&path).unwrap(), None);
    }

    #[test]
    fn test_legacy_config_gets_version_and_keeps_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emovox.toml");
        std::fs::write(&path, "[server]\nbase_url = \"http://ser.lan:8000\"\n").unwrap();

        ensure_config(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("config_version"));
        let config = EmovoxConfig::parse(&content).unwrap();
        assert_eq!(config.server.base_url, "http://ser.lan:8000");
    }
}
