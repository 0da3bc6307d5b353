use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub backend_url: Option<String>,
    pub log_filter: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("invalid config file {}", config_path.display()))?;
        Ok(config)
    }

    /// Backend origin: an explicit choice (flag or env) wins over the file.
    pub fn backend_url(&self, cli_override: Option<String>) -> String {
        let url = cli_override
            .or_else(|| self.backend_url.clone())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        url.trim_end_matches('/').to_string()
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    pub fn default_log_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("wayfarer")
            .join("wayfarer.log")
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("wayfarer").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.backend_url(None), DEFAULT_BACKEND_URL);
        assert_eq!(config.log_filter(), "info");
    }

    #[test]
    fn test_file_values_are_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"backend_url": "http://planner.lan:9000/", "log_filter": "wayfarer_core=debug"}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.backend_url(None), "http://planner.lan:9000");
        assert_eq!(config.log_filter(), "wayfarer_core=debug");
    }

    #[test]
    fn test_override_beats_file() {
        let config = Config {
            backend_url: Some("http://from-file:8000".to_string()),
            log_filter: None,
        };
        assert_eq!(
            config.backend_url(Some("http://from-flag:8000".to_string())),
            "http://from-flag:8000"
        );
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
