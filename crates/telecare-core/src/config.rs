//! Configuration management for the Telecare admin client

use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// REST gateway configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Dashboard behaviour (debounce, page sizes)
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// REST gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every endpoint path is joined onto
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Blanket request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,

    /// Pre-issued bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Dashboard behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Quiet window for free-text search, in milliseconds
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// Page size for list views
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Page size used when fanning out a user's detail view
    #[serde(default = "default_detail_page_size")]
    pub detail_page_size: u32,

    /// Page size for the video library
    #[serde(default = "default_video_page_size")]
    pub video_page_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (`json` or `pretty`)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

const fn default_timeout_seconds() -> u64 {
    30
}

const fn default_connect_timeout_seconds() -> u64 {
    5
}

fn default_user_agent() -> String {
    format!("telecare-admin/{}", env!("CARGO_PKG_VERSION"))
}

const fn default_search_debounce_ms() -> u64 {
    500
}

const fn default_page_size() -> u32 {
    10
}

const fn default_detail_page_size() -> u32 {
    200
}

const fn default_video_page_size() -> u32 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            auth_token: None,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: default_search_debounce_ms(),
            default_page_size: default_page_size(),
            detail_page_size: default_detail_page_size(),
            video_page_size: default_video_page_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as a [`Duration`]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Connect timeout as a [`Duration`]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

impl DashboardConfig {
    /// Search debounce window as a [`Duration`]
    pub const fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl Config {
    /// Load configuration from `telecare.toml` (optional) and `TELECARE_*`
    /// environment variables, e.g. `TELECARE_API__BASE_URL`
    pub fn load() -> crate::Result<Self> {
        Self::build(config::File::with_name("telecare").required(false))
    }

    /// Load configuration from an explicit file, still honouring the environment
    pub fn load_from(path: impl AsRef<Path>) -> crate::Result<Self> {
        Self::build(config::File::from(path.as_ref()).required(true))
    }

    fn build<S>(file: S) -> crate::Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("TELECARE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::Error::Configuration {
                message: e.to_string(),
            })?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| crate::Error::Configuration {
                message: e.to_string(),
            })?;

        loaded.validate()?;
        tracing::debug!(base_url = %loaded.api.base_url, "configuration loaded");
        Ok(loaded)
    }

    /// Reject settings the client cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(crate::Error::validation("api.base_url", "must not be empty"));
        }
        if self.api.timeout_seconds == 0 {
            return Err(crate::Error::validation(
                "api.timeout_seconds",
                "must be greater than zero",
            ));
        }

        let page_sizes = [
            ("dashboard.default_page_size", self.dashboard.default_page_size),
            ("dashboard.detail_page_size", self.dashboard.detail_page_size),
            ("dashboard.video_page_size", self.dashboard.video_page_size),
        ];
        for (field, size) in page_sizes {
            if size == 0 {
                return Err(crate::Error::validation(field, "must be at least 1"));
            }
        }

        Ok(())
    }
}
