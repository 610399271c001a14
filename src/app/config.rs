use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::info;
use url::Url;

use crate::error::{Error, Result};
use crate::platform::AppPaths;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub ui: UIConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub api_base: String,
    pub request_timeout_secs: u64,
    pub health_check_on_startup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UIConfig {
    pub theme: String,
    pub show_timestamps: bool,
    pub tick_rate_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 30,
            health_check_on_startup: true,
        }
    }
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(), // dark, light, matrix
            show_timestamps: true,
            tick_rate_ms: 250,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            ui: UIConfig::default(),
        }
    }
}

impl BackendConfig {
    /// Base URL without a trailing slash, ready for `{base}/chat` joins.
    pub fn base_url(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AppConfig {
    pub async fn load(paths: &AppPaths) -> Result<Self> {
        let config_file = paths.config_file();

        if !config_file.exists() {
            info!("Config file not found, creating default configuration");
            let default_config = Self::default();
            default_config.save_to(&config_file).await?;
            return Ok(default_config);
        }

        Self::load_from(&config_file).await
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        info!("Loading configuration from: {:?}", path);

        let config_content = fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&config_content)
            .map_err(|e| Error::Config(config::ConfigError::Message(e.to_string())))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        info!("Saving configuration to: {:?}", path);

        let config_content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(config::ConfigError::Message(e.to_string())))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, config_content).await?;

        info!("Configuration saved successfully");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.backend.api_base)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::validation(format!(
                "API base must use http or https, got {}",
                url.scheme()
            )));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(Error::validation("API base must not carry a query or fragment"));
        }

        if self.backend.request_timeout_secs == 0 || self.backend.request_timeout_secs > 600 {
            return Err(Error::validation("Request timeout must be between 1 and 600 seconds"));
        }

        if !matches!(self.ui.theme.as_str(), "dark" | "light" | "matrix") {
            return Err(Error::validation(format!("Unknown theme: {}", self.ui.theme)));
        }

        if self.ui.tick_rate_ms < 50 || self.ui.tick_rate_ms > 2000 {
            return Err(Error::validation("Tick rate must be between 50 and 2000 ms"));
        }

        Ok(())
    }

    /// Applies a command-line override of the API base and re-validates.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Result<Self> {
        self.backend.api_base = api_base.into();
        self.validate()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.backend.api_base, "http://localhost:8000");
        assert_eq!(config.backend.request_timeout(), Duration::from_secs(30));
        assert!(config.backend.health_check_on_startup);
        assert_eq!(config.ui.theme, "dark");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.backend.api_base = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config.backend.api_base = "not a url".to_string();
        assert!(matches!(config.validate(), Err(Error::Url(_))));

        config.backend.api_base = DEFAULT_API_BASE.to_string();
        config.backend.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.backend.request_timeout_secs = 30;
        config.ui.theme = "neon".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let mut config = AppConfig::default();
        config.backend.api_base = "https://chat.example.com/api/".to_string();
        assert_eq!(config.backend.base_url(), "https://chat.example.com/api");
    }

    #[test]
    fn test_api_base_override() {
        let config = AppConfig::default()
            .with_api_base("http://10.0.0.5:9000")
            .unwrap();
        assert_eq!(config.backend.api_base, "http://10.0.0.5:9000");

        assert!(AppConfig::default().with_api_base("localhost").is_err());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.backend.api_base = "http://127.0.0.1:8123".to_string();
        config.ui.theme = "light".to_string();
        config.save_to(&path).await.unwrap();

        let loaded = AppConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded.backend.api_base, "http://127.0.0.1:8123");
        assert_eq!(loaded.ui.theme, "light");
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[backend]\napi_base = \"http://example.com:8000\"\n")
            .await
            .unwrap();

        let loaded = AppConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded.backend.api_base, "http://example.com:8000");
        assert_eq!(loaded.backend.request_timeout_secs, 30);
        assert_eq!(loaded.ui.tick_rate_ms, 250);
    }

    #[tokio::test]
    async fn test_invalid_toml_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "backend = [").await.unwrap();

        let result = AppConfig::load_from(&path).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
