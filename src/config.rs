//! Configuration
//!
//! Optional defaults read from `<config_dir>/adk-utils/config.json`.
//! The file is only ever read; command-line flags take precedence.

use crate::gcp::endpoint::GLOBAL_LOCATION;
use crate::operation::DEFAULT_POLL_INTERVAL;
use crate::pagination::DEFAULT_PAGE_SIZE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Project used when `--project` is not given
    #[serde(default)]
    pub project_id: Option<String>,
    /// Location used when `--location` is not given
    #[serde(default)]
    pub location: Option<String>,
    /// Page size for paginated listings
    #[serde(default)]
    pub page_size: Option<u32>,
    /// Delay between polls when following an operation
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("adk-utils").join("config.json"))
    }

    /// Load the user config; a missing file means defaults
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// CLI > config > environment / gcloud default
    pub fn effective_project(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.project_id.clone())
            .or_else(crate::gcp::auth::get_default_project)
    }

    /// CLI > config > `global`
    pub fn effective_location(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.location.clone())
            .unwrap_or_else(|| GLOBAL_LOCATION.to_string())
    }

    /// CLI > config > 5
    pub fn effective_page_size(&self, cli: Option<u32>) -> u32 {
        cli.or(self.page_size).unwrap_or(DEFAULT_PAGE_SIZE).max(1)
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.effective_page_size(None), 5);
        assert_eq!(config.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.effective_location(None), "global");
    }

    #[test]
    fn test_cli_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"project_id": "cfg-project", "location": "eu", "page_size": 20, "poll_interval_secs": 3}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.effective_project(None).as_deref(), Some("cfg-project"));
        assert_eq!(config.effective_project(Some("cli-project")).as_deref(), Some("cli-project"));
        assert_eq!(config.effective_location(None), "eu");
        assert_eq!(config.effective_location(Some("us")), "us");
        assert_eq!(config.effective_page_size(None), 20);
        assert_eq!(config.effective_page_size(Some(0)), 1);
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
