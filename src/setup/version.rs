//! Config version tracking.
//!
//! The first line of the config file records the version that wrote it:
//! `config_version = "X.Y.Z"`.

use anyhow::anyhow;
use regex::Regex;
use std::cmp::Ordering;
use std::path::Path;

const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A `major.minor.patch` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Version(u32, u32, u32);

impl Version {
    fn parse(text: &str) -> anyhow::Result<Self> {
        let parts = text
            .trim()
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| anyhow!("Invalid version component '{part}' in '{text}'"))
            })
            .collect::<anyhow::Result<Vec<u32>>>()?;

        match parts.as_slice() {
            [major, minor, patch] => Ok(Version(*major, *minor, *patch)),
            _ => Err(anyhow!(
                "Invalid version format: '{text}'. Expected 'major.minor.patch'"
            )),
        }
    }
}

/// Reads the version recorded on the first line of the config file.
fn read_config_version(config_path: &Path) -> anyhow::Result<Option<String>> {
    let content = std::fs::read_to_string(config_path)?;
    let Some(first_line) = content.lines().next() else {
        return Ok(None);
    };

    let pattern = Regex::new(r#"^\s*config_version\s*=\s*"([^"]+)""#)?;
    Ok(pattern
        .captures(first_line)
        .map(|caps| caps[1].to_string()))
}

/// Returns the outdated version when setup must run again.
///
/// `None` means the config is current (or newer than this binary, which is
/// logged and tolerated). A config without a version line counts as outdated.
///
/// # Errors
/// - If the file cannot be read or holds a malformed version
pub fn check_setup_needed(config_path: &Path) -> anyhow::Result<Option<String>> {
    if !config_path.exists() {
        return Ok(None);
    }

    let Some(config_version) = read_config_version(config_path)? else {
        return Ok(Some("unknown (legacy config)".to_string()));
    };

    match Version::parse(&config_version)?.cmp(&Version::parse(CURRENT_VERSION)?) {
        Ordering::Less => Ok(Some(config_version)),
        Ordering::Equal => Ok(None),
        Ordering::Greater => {
            tracing::warn!(
                "Config version {} is newer than app version {}",
                config_version,
                CURRENT_VERSION
            );
            Ok(None)
        }
    }
}

/// Rewrites the `config_version` line as the first line, keeping everything else.
///
/// # Errors
/// - If the file cannot be read or written
pub fn update_config_version(config_path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(config_path)?;
    let body: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim_start().starts_with("config_version"))
        .collect();

    let mut updated = format!("config_version = \"{CURRENT_VERSION}\"");
    for line in body {
        updated.push('\n');
        updated.push_str(line);
    }
    updated.push('\n');

    std::fs::write(config_path, updated)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse_and_order() {
        assert_eq!(Version::parse("0.2.10").unwrap(), Version(0, 2, 10));
        assert!(Version::parse("0.0.9").unwrap() < Version::parse("0.1.0").unwrap());
        assert!(Version::parse("1.0").is_err());
        assert!(Version::parse("1.0.0.1").is_err());
        assert!(Version::parse("one.two.three").is_err());
    }

    #[test]
    fn test_older_config_needs_setup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emovox.toml");
        std::fs::write(&path, "config_version = \"0.0.0\"\n[audio]\n").unwrap();
        assert_eq!(check_setup_needed(&path).unwrap(), Some("0.0.0".to_string()));

        update_config_version(&path).unwrap();
        assert_eq!(check_setup_needed(&path).unwrap(), None);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("config_version").count(), 1);
        assert!(content.contains("[audio]"));
    }

    #[test]
    fn test_commented_version_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emovox.toml");
        std::fs::write(&path, "# config_version = \"9.9.9\"\n").unwrap();
        assert_eq!(
            check_setup_needed(&path).unwrap(),
            Some("unknown (legacy config)".to_string())
        );
    }
}
