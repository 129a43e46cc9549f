// SPDX-License-Identifier: MIT

//! Dashboard configuration: built-in defaults, then `config.json` in the
//! platform config directory, then environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed config file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the hub REST API.
    pub api_base_url: String,
    /// IFC model opened on the BIM page.
    pub model_path: Option<PathBuf>,
    pub rows_per_page: usize,
    /// Sensor table refresh period. Zero disables the refresh.
    pub refresh_interval_secs: u64,
    /// Where chart exports are written, the working directory if unset.
    pub export_dir: Option<PathBuf>,
    /// Serve the built-in demo data instead of talking to the API.
    pub offline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            model_path: None,
            rows_per_page: 5,
            refresh_interval_secs: 30,
            export_dir: None,
            offline: false,
        }
    }
}

impl Config {
    /// Load the layered configuration from the default locations.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                log::info!("Using config file {}", path.display());
                Ok(serde_json::from_str(&content)?)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Override fields from environment variables, looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("HUB_API_URL").filter(|url| !url.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(path) = var("HUB_MODEL_PATH").filter(|path| !path.is_empty()) {
            self.model_path = Some(PathBuf::from(path));
        }
        if let Some(path) = var("HUB_EXPORT_DIR").filter(|path| !path.is_empty()) {
            self.export_dir = Some(PathBuf::from(path));
        }
        if let Some(secs) = var("HUB_REFRESH_SECS") {
            match secs.parse() {
                Ok(secs) => self.refresh_interval_secs = secs,
                Err(_) => log::warn!("Ignoring invalid HUB_REFRESH_SECS={secs}"),
            }
        }
        if let Some(offline) = var("HUB_OFFLINE") {
            self.offline = !matches!(offline.as_str(), "" | "0" | "false");
        }
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// `config.json` inside the platform config directory.
pub fn config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("site", "hub", "hub-dashboard")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_file(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "api_base_url": "http://hub.local:9000", "rows_per_page": 10 }"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.api_base_url, "http://hub.local:9000");
        assert_eq!(config.rows_per_page, 10);
        assert_eq!(config.refresh_interval_secs, 30);
        assert_eq!(config.model_path, None);
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ rows_per_page: ").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env = HashMap::from([
            ("HUB_API_URL", "http://10.0.0.2:8000"),
            ("HUB_MODEL_PATH", "/srv/hub.ifc"),
            ("HUB_REFRESH_SECS", "not a number"),
            ("HUB_OFFLINE", "1"),
        ]);
        let mut config = Config {
            refresh_interval_secs: 10,
            ..Config::default()
        };
        config.apply_env(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.api_base_url, "http://10.0.0.2:8000");
        assert_eq!(config.model_path, Some(PathBuf::from("/srv/hub.ifc")));
        assert_eq!(config.refresh_interval_secs, 10);
        assert!(config.offline);
        assert_eq!(config.export_dir(), PathBuf::from("."));
    }
}
