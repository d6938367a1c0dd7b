use crate::error::{AppError, Result};
use crate::search::SearchConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file read when `CONFIG_PATH` is not set
pub const DEFAULT_CONFIG_PATH: &str = "config/youtrack-search.toml";

/// Prefix of environment variable overrides, e.g. `YOUTRACK_SEARCH__YOUTRACK__URL`
pub const ENV_PREFIX: &str = "YOUTRACK_SEARCH";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// YouTrack connection configuration
    #[serde(default)]
    pub youtrack: YouTrackConfig,

    /// Search engine configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(config_path)
    }

    /// Load configuration with `path` as the optional override file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let settings = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::from(path.as_ref()).required(false))
            // Override with environment variables (prefix: YOUTRACK_SEARCH__)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YouTrackConfig {
    /// Instance URL without the `/api` suffix
    pub url: Option<String>,

    /// Cloud workspace name, used when no URL is set
    pub workspace: Option<String>,

    /// API token; takes precedence over the environment and token file
    pub api_token: Option<String>,

    /// Environment variable holding the API token
    #[serde(default = "default_api_token_env")]
    pub api_token_env: String,

    /// File holding the API token
    pub token_file: Option<PathBuf>,

    /// Verify TLS certificates
    #[serde(default = "default_true")]
    pub verify_ssl: bool,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retries for rate-limited and server errors
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial retry backoff (milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for YouTrackConfig {
    fn default() -> Self {
        Self {
            url: None,
            workspace: None,
            api_token: None,
            api_token_env: default_api_token_env(),
            token_file: None,
            verify_ssl: true,
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl YouTrackConfig {
    /// Find the API token: explicit value, then environment, then token file
    pub fn resolve_token(&self) -> Result<String> {
        if let Some(token) = non_empty(self.api_token.as_deref()) {
            return Ok(token.to_string());
        }

        if let Ok(token) = std::env::var(&self.api_token_env) {
            if !token.trim().is_empty() {
                return Ok(token.trim().to_string());
            }
        }

        if let Some(path) = &self.token_file {
            let token = std::fs::read_to_string(path).map_err(|e| {
                AppError::Configuration(format!(
                    "Failed to read token file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            if let Some(token) = non_empty(Some(&token)) {
                return Ok(token.to_string());
            }
        }

        Err(AppError::Configuration(format!(
            "No YouTrack API token: set youtrack.api_token, the {} environment variable or youtrack.token_file",
            self.api_token_env
        )))
    }

    /// API root: explicit URL, else cloud workspace from config or from a
    /// `perm:user.workspace.secret` token
    pub fn base_url(&self, token: &str) -> Result<String> {
        if let Some(url) = non_empty(self.url.as_deref()) {
            let url = url.trim_end_matches('/');
            return Ok(if url.ends_with("/api") {
                url.to_string()
            } else {
                format!("{}/api", url)
            });
        }

        let workspace = non_empty(self.workspace.as_deref()).or_else(|| {
            token
                .strip_prefix("perm:")
                .and_then(|rest| rest.split('.').nth(1))
                .filter(|ws| !ws.is_empty())
        });

        workspace
            .map(|ws| format!("https://{}.youtrack.cloud/api", ws))
            .ok_or_else(|| {
                AppError::Configuration(
                    "Cannot determine YouTrack URL: set youtrack.url, youtrack.workspace or use a perm:user.workspace token"
                        .to_string(),
                )
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn default_api_token_env() -> String {
    "YOUTRACK_API_TOKEN".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        assert_eq!(default_timeout(), 30);
        assert_eq!(default_max_retries(), 3);
        assert_eq!(default_log_level(), "info");
        assert!(default_true());
    }

    #[test]
    fn test_base_url_from_explicit_url() {
        let config = YouTrackConfig {
            url: Some("https://tracker.example.com/".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.base_url("token").unwrap(),
            "https://tracker.example.com/api"
        );

        let config = YouTrackConfig {
            url: Some("https://tracker.example.com/api".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.base_url("token").unwrap(),
            "https://tracker.example.com/api"
        );
    }

    #[test]
    fn test_base_url_from_workspace() {
        let config = YouTrackConfig {
            workspace: Some("acme".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.base_url("token").unwrap(),
            "https://acme.youtrack.cloud/api"
        );
    }

    #[test]
    fn test_base_url_from_token() {
        let config = YouTrackConfig::default();
        assert_eq!(
            config.base_url("perm:jdoe.acme.c2VjcmV0").unwrap(),
            "https://acme.youtrack.cloud/api"
        );
        assert!(config.base_url("opaque-token").is_err());
    }

    #[test]
    fn test_explicit_token_wins() {
        let config = YouTrackConfig {
            api_token: Some("  explicit ".to_string()),
            api_token_env: "YOUTRACK_SEARCH_TEST_UNSET_TOKEN".to_string(),
            ..Default::default()
        };
        assert_eq!(config.resolve_token().unwrap(), "explicit");
    }

    #[test]
    fn test_missing_token_is_a_configuration_error() {
        let config = YouTrackConfig {
            api_token_env: "YOUTRACK_SEARCH_TEST_UNSET_TOKEN".to_string(),
            ..Default::default()
        };
        let err = config.resolve_token().unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }
}
